use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::error::{PipelineError, Result};
use crate::model::{Area, Coordinate};
use crate::provider::google::DEFAULT_BASE_URL;

/// Most nearby-search pages the provider will ever serve for one query.
pub const PROVIDER_PAGE_CAP: usize = 3;

/// Provider rate-limit policy. All delays are blocking sleeps.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimits {
    /// Wait before using a freshly issued page token.
    pub inter_page_delay: Duration,
    pub inter_area_delay: Duration,
    /// Wait after every detail request, successful or not.
    pub inter_review_delay: Duration,
    pub max_pages_per_area: usize,
}

impl Default for RateLimits {
    fn default() -> Self {
        RateLimits {
            inter_page_delay: Duration::from_secs(2),
            inter_area_delay: Duration::from_secs(1),
            inter_review_delay: Duration::from_millis(100),
            max_pages_per_area: 3,
        }
    }
}

impl RateLimits {
    /// Same page cap, no sleeping.
    pub fn none() -> Self {
        RateLimits {
            inter_page_delay: Duration::ZERO,
            inter_area_delay: Duration::ZERO,
            inter_review_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Pages to request per area, held to `1..=PROVIDER_PAGE_CAP`.
    pub fn page_cap(&self) -> usize {
        self.max_pages_per_area.clamp(1, PROVIDER_PAGE_CAP)
    }
}

/// Everything the collectors need besides the provider handle.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectOptions {
    pub limits: RateLimits,
    pub category: String,
    pub language: String,
}

impl Default for CollectOptions {
    fn default() -> Self {
        CollectOptions {
            limits: RateLimits::default(),
            category: "cafe".to_string(),
            language: "en".to_string(),
        }
    }
}

pub(crate) fn pause(delay: Duration) {
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }
}

/// Process settings: defaults, then `config/settings.*`, then `CAFES_*` env vars.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub api_key: Option<String>,
    pub areas_path: PathBuf,
    pub output_dir: PathBuf,
    pub inter_page_delay_ms: u64,
    pub inter_area_delay_ms: u64,
    pub inter_review_delay_ms: u64,
    pub max_pages_per_area: usize,
    pub request_timeout_secs: u64,
    pub category: String,
    pub language: String,
    pub base_url: String,
}

impl Settings {
    pub fn load() -> Result<Self> {
        let builder = Self::defaults()?
            .add_source(File::with_name("config/settings").required(false))
            .add_source(Environment::with_prefix("CAFES"));
        Self::from_builder(builder)
    }

    fn from_builder(builder: config::ConfigBuilder<config::builder::DefaultState>) -> Result<Self> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if !(1..=PROVIDER_PAGE_CAP).contains(&self.max_pages_per_area) {
            return Err(PipelineError::InvalidSetting {
                key: "max_pages_per_area",
                reason: format!(
                    "must be in 1..={PROVIDER_PAGE_CAP}, got {}",
                    self.max_pages_per_area
                ),
            });
        }
        Ok(())
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        let limits = RateLimits::default();
        let options = CollectOptions::default();
        Ok(Config::builder()
            .set_default("areas_path", "config/areas.toml")?
            .set_default("output_dir", "data/raw")?
            .set_default("inter_page_delay_ms", limits.inter_page_delay.as_millis() as u64)?
            .set_default("inter_area_delay_ms", limits.inter_area_delay.as_millis() as u64)?
            .set_default(
                "inter_review_delay_ms",
                limits.inter_review_delay.as_millis() as u64,
            )?
            .set_default("max_pages_per_area", limits.max_pages_per_area as u64)?
            .set_default("request_timeout_secs", 30u64)?
            .set_default("category", options.category)?
            .set_default("language", options.language)?
            .set_default("base_url", DEFAULT_BASE_URL)?)
    }

    pub fn rate_limits(&self) -> RateLimits {
        RateLimits {
            inter_page_delay: Duration::from_millis(self.inter_page_delay_ms),
            inter_area_delay: Duration::from_millis(self.inter_area_delay_ms),
            inter_review_delay: Duration::from_millis(self.inter_review_delay_ms),
            max_pages_per_area: self.max_pages_per_area,
        }
    }

    pub fn collect_options(&self) -> CollectOptions {
        CollectOptions {
            limits: self.rate_limits(),
            category: self.category.clone(),
            language: self.language.clone(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    areas: Vec<AreaEntry>,
}

#[derive(Debug, Deserialize)]
struct AreaEntry {
    name: String,
    region: String,
    center: Option<Vec<f64>>,
    radius_meters: Option<u32>,
}

const MAX_RADIUS_METERS: u32 = 50_000;

/// Ordered, validated list of search areas.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaCatalog {
    areas: Vec<Area>,
}

impl AreaCatalog {
    /// Format is picked from the file extension (toml, yaml, json).
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_source(File::from(path))
    }

    pub fn parse(text: &str, format: FileFormat) -> Result<Self> {
        Self::from_source(File::from_str(text, format))
    }

    fn from_source<S>(source: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let file: CatalogFile = Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?;
        let areas = file
            .areas
            .into_iter()
            .map(validate_area)
            .collect::<Result<Vec<_>>>()?;
        Self::new(areas)
    }

    pub fn new(areas: Vec<Area>) -> Result<Self> {
        if areas.is_empty() {
            return Err(PipelineError::EmptyCatalog);
        }
        Ok(AreaCatalog { areas })
    }

    pub fn areas(&self) -> &[Area] {
        &self.areas
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }
}

fn validate_area(entry: AreaEntry) -> Result<Area> {
    let invalid = |reason: String| PipelineError::InvalidArea {
        area: format!("{} ({})", entry.name, entry.region),
        reason,
    };

    let center = match entry.center.as_deref() {
        Some([lat, lon]) => Coordinate {
            lat: *lat,
            lon: *lon,
        },
        Some(other) => {
            return Err(invalid(format!(
                "center needs [lat, lon], got {} values",
                other.len()
            )))
        }
        None => return Err(invalid("missing center".to_string())),
    };
    if !(-90.0..=90.0).contains(&center.lat) || !(-180.0..=180.0).contains(&center.lon) {
        return Err(invalid(format!(
            "center ({}, {}) out of range",
            center.lat, center.lon
        )));
    }

    let radius_meters = entry
        .radius_meters
        .ok_or_else(|| invalid("missing radius_meters".to_string()))?;
    if radius_meters == 0 || radius_meters > MAX_RADIUS_METERS {
        return Err(invalid(format!(
            "radius_meters must be in 1..={MAX_RADIUS_METERS}, got {radius_meters}"
        )));
    }

    Ok(Area {
        name: entry.name,
        region: entry.region,
        center,
        radius_meters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
[[areas]]
name = "Tiong Bahru"
region = "Central"
center = [1.2847, 103.8270]
radius_meters = 800

[[areas]]
name = "Katong"
region = "East"
center = [1.3050, 103.9050]
radius_meters = 1200
"#;

    #[test]
    fn parses_catalog_in_file_order() {
        let catalog = AreaCatalog::parse(CATALOG, FileFormat::Toml).unwrap();
        assert_eq!(catalog.len(), 2);
        let names: Vec<&str> = catalog.areas().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Tiong Bahru", "Katong"]);
        assert_eq!(catalog.areas()[0].center.lat, 1.2847);
        assert_eq!(catalog.areas()[1].radius_meters, 1200);
    }

    #[test]
    fn yaml_catalog_is_accepted() {
        let yaml = "areas:\n  - name: Holland Village\n    region: West\n    center: [1.311, 103.796]\n    radius_meters: 600\n";
        let catalog = AreaCatalog::parse(yaml, FileFormat::Yaml).unwrap();
        assert_eq!(catalog.areas()[0].region, "West");
    }

    #[test]
    fn missing_center_is_fatal() {
        let toml = "[[areas]]\nname = \"Bugis\"\nregion = \"Central\"\nradius_meters = 500\n";
        let err = AreaCatalog::parse(toml, FileFormat::Toml).unwrap_err();
        match err {
            PipelineError::InvalidArea { area, reason } => {
                assert!(area.contains("Bugis"));
                assert!(reason.contains("center"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_radius_is_fatal() {
        let toml = "[[areas]]\nname = \"Bugis\"\nregion = \"Central\"\ncenter = [1.3, 103.85]\n";
        assert!(matches!(
            AreaCatalog::parse(toml, FileFormat::Toml),
            Err(PipelineError::InvalidArea { .. })
        ));
    }

    #[test]
    fn out_of_range_center_is_fatal() {
        let toml = "[[areas]]\nname = \"Nowhere\"\nregion = \"X\"\ncenter = [103.85, 1.3]\nradius_meters = 500\n";
        assert!(matches!(
            AreaCatalog::parse(toml, FileFormat::Toml),
            Err(PipelineError::InvalidArea { .. })
        ));
    }

    #[test]
    fn empty_catalog_is_fatal() {
        assert!(matches!(
            AreaCatalog::parse("areas = []", FileFormat::Toml),
            Err(PipelineError::EmptyCatalog)
        ));
        assert!(matches!(AreaCatalog::new(vec![]), Err(PipelineError::EmptyCatalog)));
    }

    #[test]
    fn settings_defaults_map_to_rate_limits() {
        let settings: Settings = Settings::defaults()
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(settings.rate_limits(), RateLimits::default());
        assert_eq!(settings.collect_options(), CollectOptions::default());
        assert!(settings.api_key.is_none());
        assert_eq!(settings.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn none_limits_keep_the_page_cap() {
        let limits = RateLimits::none();
        assert_eq!(limits.max_pages_per_area, 3);
        assert!(limits.inter_page_delay.is_zero());
    }

    fn settings_with_pages(pages: i64) -> Result<Settings> {
        let builder = Settings::defaults()
            .unwrap()
            .set_override("max_pages_per_area", pages)
            .unwrap();
        Settings::from_builder(builder)
    }

    #[test]
    fn page_setting_outside_provider_cap_is_rejected() {
        for pages in [0, 4, 10] {
            match settings_with_pages(pages) {
                Err(PipelineError::InvalidSetting { key, reason }) => {
                    assert_eq!(key, "max_pages_per_area");
                    assert!(reason.contains(&pages.to_string()));
                }
                other => panic!("{pages} pages accepted: {other:?}"),
            }
        }
        for pages in 1..=3 {
            let settings = settings_with_pages(pages).unwrap();
            assert_eq!(settings.rate_limits().page_cap(), pages as usize);
        }
    }

    #[test]
    fn page_cap_is_clamped_for_hand_built_limits() {
        let mut limits = RateLimits::none();
        limits.max_pages_per_area = 10;
        assert_eq!(limits.page_cap(), 3);
        limits.max_pages_per_area = 0;
        assert_eq!(limits.page_cap(), 1);
    }
}
