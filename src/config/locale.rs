use clap::ValueEnum;
use serde::Deserialize;

use super::CoverageMode;
use crate::domain::Category;

/// Language for labels and output file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Nl,
}

impl Locale {
    pub fn strings(self) -> LocaleStrings {
        LocaleStrings { locale: self }
    }
}

/// Labels and file names for one locale. Passed explicitly to whatever
/// writes output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocaleStrings {
    locale: Locale,
}

impl LocaleStrings {
    /// Legend name of a category; unknown categories keep their own name.
    pub fn legend_name(&self, category: &Category) -> String {
        let name = match (self.locale, category.as_str()) {
            (Locale::En, "wo") => "University Education",
            (Locale::En, "hbo") => "Higher Education",
            (Locale::Nl, "wo") => "Wetenschappelijk Onderwijs",
            (Locale::Nl, "hbo") => "Hoger Beroepsonderwijs",
            (_, other) => other,
        };
        name.to_string()
    }

    pub fn legend_title(&self, mode: CoverageMode) -> &'static str {
        match (self.locale, mode) {
            (Locale::En, CoverageMode::Buffer) => "Distance in Kilometers",
            (Locale::En, CoverageMode::Isochrone) => "Travel Time in Minutes",
            (Locale::Nl, CoverageMode::Buffer) => "Afstand in kilometers",
            (Locale::Nl, CoverageMode::Isochrone) => "Reistijd in minuten",
        }
    }

    /// Label for a band spanning `lower..upper` thresholds, e.g. `<10 km`,
    /// `10-15 km`, `>20 km` for buffers or minutes for isochrones.
    pub fn band_label(&self, mode: CoverageMode, lower: Option<f64>, upper: Option<f64>) -> String {
        let (divisor, unit) = match mode {
            CoverageMode::Buffer => (1000.0, "km"),
            CoverageMode::Isochrone => (60.0, "min"),
        };
        let amount = |v: f64| format!("{}", (v / divisor * 10.0).round() / 10.0);

        match (lower, upper) {
            (None, Some(upper)) => format!("<{} {}", amount(upper), unit),
            (Some(lower), Some(upper)) => format!("{}-{} {}", amount(lower), amount(upper), unit),
            (Some(lower), None) => format!(">{} {}", amount(lower), unit),
            (None, None) => match self.locale {
                Locale::En => "everywhere".to_string(),
                Locale::Nl => "overal".to_string(),
            },
        }
    }

    pub fn output_file(&self, mode: CoverageMode) -> String {
        match self.locale {
            Locale::En => format!("reachbands_{}.geojson", mode.name()),
            Locale::Nl => format!("reachbanden_{}.geojson", mode.name()),
        }
    }

    pub fn diagnostics_file(&self, mode: CoverageMode) -> String {
        match self.locale {
            Locale::En => format!("reachbands_{}_diagnostics.json", mode.name()),
            Locale::Nl => format!("reachbanden_{}_diagnostiek.json", mode.name()),
        }
    }
}
