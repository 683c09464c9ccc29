use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use serde::Serialize;

use crate::config::GarmentConfig;

/// 既定の衣服ID → モデルファイル名
const DEFAULT_GARMENTS: [(&str, &str); 7] = [
    ("busy_bees_cream", "Busy_Bees_Cream.glb"),
    ("busy_bees_white", "Busy_Bees_White.glb"),
    ("colony_invader_black", "Colony_Invader_Black.glb"),
    ("colony_invader_white", "Colony_Invader_White.glb"),
    ("fly_shirt", "Fly_Shirt.glb"),
    ("self_discovery", "Self_Discovery_Shirt.glb"),
    ("sunflower", "Sunflower_Shirt.glb"),
];

/// 衣服IDとモデルパスの対応表
#[derive(Debug, Clone)]
pub struct GarmentCatalog {
    models: BTreeMap<String, PathBuf>,
    selected: String,
}

impl GarmentCatalog {
    /// 既定の7着。`model_dir` 以下のパスになる
    pub fn builtin<P: AsRef<Path>>(model_dir: P) -> Self {
        let dir = model_dir.as_ref();
        let models = DEFAULT_GARMENTS
            .iter()
            .map(|(id, file)| (id.to_string(), dir.join(file)))
            .collect();
        Self {
            models,
            selected: DEFAULT_GARMENTS[0].0.to_string(),
        }
    }

    /// 設定から構築。catalog が空なら既定のカタログ
    pub fn from_config(config: &GarmentConfig) -> Result<Self> {
        let mut catalog = if config.catalog.is_empty() {
            Self::builtin(&config.model_dir)
        } else {
            let dir = Path::new(&config.model_dir);
            let models = config
                .catalog
                .iter()
                .map(|(id, path)| (id.clone(), dir.join(path)))
                .collect();
            Self {
                models,
                selected: String::new(),
            }
        };
        catalog.select(&config.selected)?;
        Ok(catalog)
    }

    pub fn select(&mut self, id: &str) -> Result<()> {
        if !self.models.contains_key(id) {
            bail!("unknown garment '{}' (available: {})", id, self.ids().collect::<Vec<_>>().join(", "));
        }
        self.selected = id.to_string();
        Ok(())
    }

    pub fn selected(&self) -> &str {
        &self.selected
    }

    pub fn model_path(&self, id: &str) -> Option<&Path> {
        self.models.get(id).map(PathBuf::as_path)
    }

    pub fn selected_model(&self) -> Option<&Path> {
        self.model_path(&self.selected)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// 表示名 (`busy_bees_cream` → `BUSY BEES CREAM`)
pub fn display_name(id: &str) -> String {
    id.split('_')
        .filter(|w| !w.is_empty())
        .map(str::to_uppercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// 深度推定のスケール係数から推定したシャツのサイズ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ShirtSize {
    S,
    M,
    L,
    XL,
    #[serde(rename = "2XL")]
    XXL,
    #[serde(rename = "3XL")]
    XXXL,
}

impl ShirtSize {
    pub fn from_scale_factor(scale_factor: f64) -> Self {
        if scale_factor < 0.9 {
            Self::S
        } else if scale_factor < 1.0 {
            Self::M
        } else if scale_factor < 1.1 {
            Self::L
        } else if scale_factor < 1.2 {
            Self::XL
        } else if scale_factor < 1.3 {
            Self::XXL
        } else {
            Self::XXXL
        }
    }

    /// (身幅, 着丈) インチ
    pub fn dimensions_in(&self) -> (f32, f32) {
        match self {
            Self::S => (21.5, 29.0),
            Self::M => (22.5, 30.0),
            Self::L => (23.5, 31.0),
            Self::XL => (24.5, 32.0),
            Self::XXL => (25.5, 33.0),
            Self::XXXL => (26.5, 34.0),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::S => "S",
            Self::M => "M",
            Self::L => "L",
            Self::XL => "XL",
            Self::XXL => "2XL",
            Self::XXXL => "3XL",
        }
    }

    /// 例: `M (22.5" x 30")`
    pub fn label(&self) -> String {
        let (chest, length) = self.dimensions_in();
        format!("{} ({}\" x {}\")", self.name(), chest, length)
    }
}

impl fmt::Display for ShirtSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog() {
        let catalog = GarmentCatalog::builtin("models");
        assert_eq!(catalog.len(), 7);
        assert_eq!(catalog.selected(), "busy_bees_cream");
        assert_eq!(
            catalog.model_path("sunflower"),
            Some(Path::new("models/Sunflower_Shirt.glb"))
        );
        assert!(catalog.model_path("hoodie").is_none());
    }

    #[test]
    fn test_from_config_override() {
        let mut config = GarmentConfig::default();
        config.catalog.insert("plain".to_string(), "plain.glb".to_string());
        config.selected = "plain".to_string();
        let catalog = GarmentCatalog::from_config(&config).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.selected_model(), Some(Path::new("models/plain.glb")));
    }

    #[test]
    fn test_unknown_selection_is_error() {
        let config = GarmentConfig {
            selected: "hoodie".to_string(),
            ..GarmentConfig::default()
        };
        assert!(GarmentCatalog::from_config(&config).is_err());

        let mut catalog = GarmentCatalog::builtin("models");
        assert!(catalog.select("fly_shirt").is_ok());
        assert!(catalog.select("nope").is_err());
        assert_eq!(catalog.selected(), "fly_shirt");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("busy_bees_cream"), "BUSY BEES CREAM");
        assert_eq!(display_name("sunflower"), "SUNFLOWER");
    }

    #[test]
    fn test_size_thresholds() {
        let cases = [
            (0.5, ShirtSize::S),
            (0.89, ShirtSize::S),
            (0.9, ShirtSize::M),
            (1.0, ShirtSize::L),
            (1.15, ShirtSize::XL),
            (1.2, ShirtSize::XXL),
            (1.3, ShirtSize::XXXL),
            (2.0, ShirtSize::XXXL),
        ];
        for (sf, expected) in cases {
            assert_eq!(ShirtSize::from_scale_factor(sf), expected, "sf={}", sf);
        }
    }

    #[test]
    fn test_size_label() {
        assert_eq!(ShirtSize::S.label(), "S (21.5\" x 29\")");
        assert_eq!(ShirtSize::XXL.label(), "2XL (25.5\" x 33\")");
    }
}
