//! Translation from the first-generation indicator table.
//!
//! The old table described indicators with free-form strings and boolean
//! transform flags. Everything string-based is resolved here, once, so the
//! analytics only ever see a typed [`IndicatorConfig`].

use serde::{Deserialize, Serialize};

use super::registry::{
    Bucket, Category, Frequency, IndicatorConfig, Region, Registry, TransformMethod, TypeTag,
};

/// Old-schema record, keyed externally by series id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyIndicatorConfig {
    pub name: String,
    pub category: String,
    pub frequency: String,
    /// "Leading", "Coincident", "Lagging" or "Contextual".
    pub indicator_type: String,
    pub region: String,
    pub use_yoy: bool,
    pub use_monthly_change: bool,
    pub inverted: bool,
    pub contextual: bool,
    pub hidden: bool,
}

/// A config record in either schema.
///
/// Current records are recognised first (they carry `series_id`, `bucket`
/// and `type_tag`); anything else is read as a legacy record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum VersionedConfig {
    Current(IndicatorConfig),
    Legacy(LegacyIndicatorConfig),
}

impl VersionedConfig {
    pub fn into_current(self, series_id: &str) -> IndicatorConfig {
        match self {
            VersionedConfig::Current(config) => config,
            VersionedConfig::Legacy(legacy) => translate(series_id, &legacy),
        }
    }
}

/// Builds a current config from an old-schema record.
pub fn translate(series_id: &str, legacy: &LegacyIndicatorConfig) -> IndicatorConfig {
    let indicator_type = legacy.indicator_type.trim().to_ascii_lowercase();
    let bucket = match indicator_type.as_str() {
        "coincident" => Bucket::Coincident,
        "lagging" => Bucket::Lagging,
        _ => Bucket::Leading,
    };

    let method = if legacy.use_yoy {
        TransformMethod::Yoy
    } else if legacy.use_monthly_change {
        TransformMethod::Mom
    } else {
        TransformMethod::Level
    };

    let name = if legacy.name.is_empty() { series_id.to_string() } else { legacy.name.clone() };

    IndicatorConfig {
        series_id: series_id.to_string(),
        type_tag: infer_type_tag(&name),
        name,
        region: Region::parse(&legacy.region).unwrap_or(Region::Us),
        bucket,
        category: Category::parse(&legacy.category),
        frequency: Frequency::parse(&legacy.frequency),
        method,
        inverted: legacy.inverted,
        cluster: None,
        unit: None,
        hidden: legacy.hidden,
        contextual: legacy.contextual || indicator_type == "contextual",
    }
}

/// Economic role guessed from display-name keywords. First match wins.
fn infer_type_tag(name: &str) -> TypeTag {
    let name = name.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| name.contains(w));

    if has(&["inflation", "cpi", "pce"]) {
        TypeTag::Inflation
    } else if has(&["curve"]) {
        TypeTag::YieldCurveSlope
    } else if has(&["yield"]) {
        TypeTag::PolicyRate
    } else if has(&["spread"]) {
        TypeTag::CreditSpread
    } else if name.contains("rate") && name.contains("real") {
        TypeTag::RealRate
    } else if has(&["sentiment", "confidence"]) {
        TypeTag::Sentiment
    } else if has(&["pmi", "production", "sales"]) {
        TypeTag::GrowthActivity
    } else if has(&["payroll", "hours"]) {
        TypeTag::LaborQuantity
    } else if has(&["unemployment"]) {
        TypeTag::LaborSlack
    } else if has(&["wage", "cost"]) {
        TypeTag::WagesCosts
    } else if has(&["housing", "houst"]) {
        TypeTag::HousingActivity
    } else if has(&["mortgage"]) {
        TypeTag::MortgageRate
    } else if has(&["lending"]) {
        TypeTag::LendingStandards
    } else if has(&["vix", "vol"]) {
        TypeTag::VolatilityRiskOff
    } else if has(&["dollar"]) {
        TypeTag::FxIndex
    } else {
        TypeTag::GrowthActivity
    }
}

/// Registry entry if one exists, else the translated legacy record.
pub fn resolve_config(
    registry: &Registry,
    series_id: &str,
    region: Region,
    legacy: Option<&LegacyIndicatorConfig>,
) -> Option<IndicatorConfig> {
    if let Some(config) = registry.get_config(series_id, region) {
        return Some(config.clone());
    }
    legacy.map(|old| translate(series_id, old))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy(name: &str, indicator_type: &str) -> LegacyIndicatorConfig {
        LegacyIndicatorConfig {
            name: name.to_string(),
            category: "Growth".to_string(),
            frequency: "monthly".to_string(),
            indicator_type: indicator_type.to_string(),
            region: "US".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_translate_flags_and_bucket() {
        let mut old = legacy("Retail Sales", "Coincident");
        old.use_yoy = true;
        old.use_monthly_change = true;

        let cfg = translate("RSAFS", &old);
        assert_eq!(cfg.bucket, Bucket::Coincident);
        // yoy takes precedence over mom
        assert_eq!(cfg.method, TransformMethod::Yoy);
        assert_eq!(cfg.type_tag, TypeTag::GrowthActivity);
        assert_eq!(cfg.region, Region::Us);
        assert!(!cfg.contextual);
    }

    #[test]
    fn test_contextual_type_becomes_flag() {
        let cfg = translate("SP500", &legacy("S&P 500", "Contextual"));
        assert_eq!(cfg.bucket, Bucket::Leading);
        assert!(cfg.contextual);
    }

    #[test]
    fn test_type_tag_keywords() {
        assert_eq!(infer_type_tag("Core CPI"), TypeTag::Inflation);
        assert_eq!(infer_type_tag("10Y-3M Yield Curve"), TypeTag::YieldCurveSlope);
        assert_eq!(infer_type_tag("German 10Y Yield"), TypeTag::PolicyRate);
        assert_eq!(infer_type_tag("10Y Real Rate"), TypeTag::RealRate);
        assert_eq!(infer_type_tag("Unemployment Rate"), TypeTag::LaborSlack);
        assert_eq!(infer_type_tag("VIX"), TypeTag::VolatilityRiskOff);
        assert_eq!(infer_type_tag("Something Else"), TypeTag::GrowthActivity);
    }

    #[test]
    fn test_resolve_prefers_registry() {
        let registry = Registry::builtin();
        let mut old = legacy("Nonfarm Payrolls", "Leading");
        old.use_yoy = true;

        let cfg = resolve_config(registry, "PAYEMS", Region::Us, Some(&old)).unwrap();
        assert_eq!(cfg.method, TransformMethod::Mom);
        assert_eq!(cfg.bucket, Bucket::Coincident);

        let cfg = resolve_config(registry, "NOT_LISTED", Region::Us, Some(&old)).unwrap();
        assert_eq!(cfg.method, TransformMethod::Yoy);
        assert!(resolve_config(registry, "NOT_LISTED", Region::Us, None).is_none());
    }

    #[test]
    fn test_versioned_config_reads_both_schemas() {
        let raw = r#"{"name": "Housing Starts", "indicator_type": "Leading", "region": "US"}"#;
        let parsed: VersionedConfig = serde_json::from_str(raw).unwrap();
        assert!(matches!(parsed, VersionedConfig::Legacy(_)));
        let cfg = parsed.into_current("HOUST");
        assert_eq!(cfg.type_tag, TypeTag::HousingActivity);
        assert_eq!(cfg.frequency, Frequency::Monthly);

        let current = serde_json::to_string(
            Registry::builtin().get_config("HOUST", Region::Us).unwrap(),
        )
        .unwrap();
        let parsed: VersionedConfig = serde_json::from_str(&current).unwrap();
        assert!(matches!(parsed, VersionedConfig::Current(_)));
    }
}
