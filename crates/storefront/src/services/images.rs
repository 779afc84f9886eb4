//! Product image discovery from the static images directory.
//!
//! Product photos are dropped into one directory using a naming convention
//! instead of being recorded in the database:
//!
//! - `{id}(n).jpeg` - base image number `n` of product `id`
//! - `{id}-{color}(n).jpeg` - image number `n` of the `color` variant
//!
//! Extensions `jpeg`, `jpg` and `png` are accepted, case-insensitively.
//! Discovery never fails: an unreadable directory yields no images.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::instrument;

use paw_core::ProductId;

/// Captures product id, optional color and sequence number.
static IMAGE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+)(?:-([a-z]+))?\((\d+)\)\.(?:jpe?g|png)$").expect("Invalid regex")
});

/// One image file that belongs to a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredImage {
    pub filename: String,
    /// Public URL, relative to the site root.
    pub url: String,
    /// Color variant, `None` for base images.
    pub color: Option<String>,
    #[serde(skip)]
    sequence: u64,
}

/// Images of one product, partitioned into base images and color groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveredImages {
    /// Base images sorted by sequence number.
    pub base: Vec<DiscoveredImage>,
    /// Color name to images sorted by sequence number.
    pub colors: BTreeMap<String, Vec<DiscoveredImage>>,
}

impl DiscoveredImages {
    /// Base images first, then each color group in order.
    pub fn all(&self) -> impl Iterator<Item = &DiscoveredImage> {
        self.base.iter().chain(self.colors.values().flatten())
    }

    /// Whether nothing was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.base.is_empty() && self.colors.is_empty()
    }
}

/// Sorted filenames of the images directory, read once and matched many times.
#[derive(Debug, Clone, Default)]
pub struct DirectorySnapshot {
    filenames: Vec<String>,
}

impl DirectorySnapshot {
    /// Build a snapshot from a list of filenames.
    #[must_use]
    pub fn from_filenames<I, S>(filenames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut filenames: Vec<String> = filenames.into_iter().map(Into::into).collect();
        filenames.sort();
        Self { filenames }
    }

    /// Images belonging to `product_id`.
    ///
    /// The id must match exactly: `111(1).jpeg` and `011(1).jpeg` are not
    /// images of product 11.
    #[must_use]
    pub fn discover(&self, product_id: ProductId) -> DiscoveredImages {
        let id = product_id.to_string();
        let mut images = DiscoveredImages::default();

        for filename in &self.filenames {
            let Some(caps) = IMAGE_NAME_RE.captures(filename) else {
                continue;
            };
            if caps.get(1).map(|m| m.as_str()) != Some(id.as_str()) {
                continue;
            }
            let sequence = caps
                .get(3)
                .and_then(|m| m.as_str().parse::<u64>().ok())
                .unwrap_or(0);
            let color = caps.get(2).map(|m| m.as_str().to_string());

            let image = DiscoveredImage {
                filename: filename.clone(),
                url: format!("images/{filename}"),
                color: color.clone(),
                sequence,
            };
            match color {
                Some(color) => images.colors.entry(color).or_default().push(image),
                None => images.base.push(image),
            }
        }

        // Stable: equal sequence numbers keep filename order.
        images.base.sort_by_key(|img| img.sequence);
        for group in images.colors.values_mut() {
            group.sort_by_key(|img| img.sequence);
        }
        images
    }
}

/// Reads the images directory.
#[derive(Debug, Clone)]
pub struct ImageDiscovery {
    dir: PathBuf,
}

impl ImageDiscovery {
    /// Create a discovery over `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// List the directory. Read failures are logged and yield an empty snapshot.
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    pub async fn snapshot(&self) -> DirectorySnapshot {
        match read_filenames(&self.dir).await {
            Ok(filenames) => DirectorySnapshot::from_filenames(filenames),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read images directory");
                DirectorySnapshot::default()
            }
        }
    }

    /// Images of a single product.
    pub async fn discover(&self, product_id: ProductId) -> DiscoveredImages {
        self.snapshot().await.discover(product_id)
    }
}

async fn read_filenames(dir: &std::path::Path) -> std::io::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut filenames = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if let Ok(name) = entry.file_name().into_string() {
            filenames.push(name);
        }
    }
    Ok(filenames)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn names(images: &[DiscoveredImage]) -> Vec<&str> {
        images.iter().map(|i| i.filename.as_str()).collect()
    }

    #[test]
    fn test_discover_partitions_base_and_colors() {
        let snapshot = DirectorySnapshot::from_filenames([
            "11(1).jpeg",
            "11(2).jpeg",
            "11-blue(1).jpeg",
            "12(1).jpeg",
        ]);

        let images = snapshot.discover(ProductId::new(11));
        assert_eq!(names(&images.base), vec!["11(1).jpeg", "11(2).jpeg"]);
        assert_eq!(images.colors.len(), 1);
        assert_eq!(names(&images.colors["blue"]), vec!["11-blue(1).jpeg"]);
        assert_eq!(images.colors["blue"][0].color.as_deref(), Some("blue"));
        assert_eq!(images.base[0].url, "images/11(1).jpeg");
        assert_eq!(images.all().count(), 3);
    }

    #[test]
    fn test_discover_sorts_by_sequence_number() {
        let snapshot = DirectorySnapshot::from_filenames(["5(10).png", "5(2).jpg", "5(1).jpeg"]);
        let images = snapshot.discover(ProductId::new(5));
        assert_eq!(names(&images.base), vec!["5(1).jpeg", "5(2).jpg", "5(10).png"]);
    }

    #[test]
    fn test_discover_rejects_prefix_sharing_ids() {
        let snapshot = DirectorySnapshot::from_filenames([
            "111(1).jpeg",
            "011(1).jpeg",
            "1(1).jpeg",
            "11-blue(1).jpeg",
        ]);
        let images = snapshot.discover(ProductId::new(11));
        assert!(images.base.is_empty());
        assert_eq!(images.all().count(), 1);

        let images = snapshot.discover(ProductId::new(1));
        assert_eq!(names(&images.base), vec!["1(1).jpeg"]);
    }

    #[test]
    fn test_discover_is_case_insensitive() {
        let snapshot = DirectorySnapshot::from_filenames(["7(1).JPEG", "7-Red(2).PNG", "7-red(1).jpg"]);
        let images = snapshot.discover(ProductId::new(7));
        assert_eq!(names(&images.base), vec!["7(1).JPEG"]);
        assert_eq!(names(&images.colors["Red"]), vec!["7-Red(2).PNG"]);
        assert_eq!(names(&images.colors["red"]), vec!["7-red(1).jpg"]);
    }

    #[test]
    fn test_discover_ignores_other_files() {
        let snapshot = DirectorySnapshot::from_filenames([
            "3(1).gif",
            "3.jpeg",
            "3(a).jpeg",
            "3-blue2(1).jpeg",
            "README.md",
        ]);
        assert!(snapshot.discover(ProductId::new(3)).is_empty());
    }

    #[test]
    fn test_all_lists_base_before_colors() {
        let snapshot =
            DirectorySnapshot::from_filenames(["9-green(1).jpeg", "9(1).jpeg", "9-blue(1).jpeg"]);
        let images = snapshot.discover(ProductId::new(9));
        let all: Vec<&str> = images.all().map(|i| i.filename.as_str()).collect();
        assert_eq!(all, vec!["9(1).jpeg", "9-blue(1).jpeg", "9-green(1).jpeg"]);
    }

    #[tokio::test]
    async fn test_missing_directory_yields_nothing() {
        let discovery = ImageDiscovery::new(std::env::temp_dir().join(format!(
            "paw-missing-{}",
            uuid::Uuid::new_v4()
        )));
        assert!(discovery.discover(ProductId::new(1)).await.is_empty());
    }

    #[tokio::test]
    async fn test_reads_directory() {
        let dir = std::env::temp_dir().join(format!("paw-images-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        for name in ["4(2).jpeg", "4(1).jpeg", "40(1).jpeg"] {
            tokio::fs::write(dir.join(name), b"").await.unwrap();
        }

        let images = ImageDiscovery::new(&dir).discover(ProductId::new(4)).await;
        assert_eq!(names(&images.base), vec!["4(1).jpeg", "4(2).jpeg"]);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
