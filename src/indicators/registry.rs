use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::legacy::VersionedConfig;

// ============================================================================
// ENUMS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "US")]
    Us,
    #[serde(rename = "Eurozone", alias = "EA19", alias = "EA")]
    Eurozone,
    #[serde(rename = "Germany", alias = "DE")]
    Germany,
    #[serde(rename = "France", alias = "FR")]
    France,
    #[serde(rename = "UK")]
    Uk,
    #[serde(rename = "Japan")]
    Japan,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Us => "US",
            Region::Eurozone => "Eurozone",
            Region::Germany => "Germany",
            Region::France => "France",
            Region::Uk => "UK",
            Region::Japan => "Japan",
        }
    }

    pub fn parse(raw: &str) -> Option<Region> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "us" | "usa" => Some(Region::Us),
            "eurozone" | "ea" | "ea19" | "ea20" => Some(Region::Eurozone),
            "germany" | "de" => Some(Region::Germany),
            "france" | "fr" => Some(Region::France),
            "uk" | "gb" => Some(Region::Uk),
            "japan" | "jp" => Some(Region::Japan),
            _ => None,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Cycle position of an indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Leading,
    Coincident,
    Lagging,
}

impl Bucket {
    pub const ALL: [Bucket; 3] = [Bucket::Leading, Bucket::Coincident, Bucket::Lagging];

    pub fn title(&self) -> &'static str {
        match self {
            Bucket::Leading => "Leading",
            Bucket::Coincident => "Coincident",
            Bucket::Lagging => "Lagging",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Annual,
    /// Published on no fixed calendar (e.g. policy rate decisions).
    Irregular,
}

impl Frequency {
    /// Approximate number of observations per year, used as the YoY shift.
    pub fn periods_per_year(&self) -> usize {
        match self {
            Frequency::Daily => 252, // Trading days
            Frequency::Weekly => 52,
            Frequency::Monthly => 12,
            Frequency::Quarterly => 4,
            Frequency::Annual => 1,
            Frequency::Irregular => 12,
        }
    }

    /// Unknown labels fall back to monthly.
    pub fn parse(raw: &str) -> Frequency {
        match raw.trim().to_ascii_lowercase().as_str() {
            "daily" => Frequency::Daily,
            "weekly" => Frequency::Weekly,
            "quarterly" => Frequency::Quarterly,
            "annual" | "yearly" => Frequency::Annual,
            "irregular" => Frequency::Irregular,
            _ => Frequency::Monthly,
        }
    }
}

/// How a raw series is turned into the representation that gets ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformMethod {
    Level,
    Mom,
    Yoy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Fixed Income")]
    FixedIncome,
    Credit,
    Growth,
    Labor,
    Sentiment,
    Housing,
    Inflation,
    Market,
    #[serde(rename = "Financial Conditions")]
    FinancialConditions,
    #[serde(other)]
    Other,
}

impl Category {
    pub fn parse(raw: &str) -> Category {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fixed income" => Category::FixedIncome,
            "credit" => Category::Credit,
            "growth" => Category::Growth,
            "labor" | "labour" => Category::Labor,
            "sentiment" => Category::Sentiment,
            "housing" => Category::Housing,
            "inflation" => Category::Inflation,
            "market" => Category::Market,
            "financial conditions" => Category::FinancialConditions,
            _ => Category::Other,
        }
    }
}

/// Thematic grouping spanning buckets, used for narrative aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cluster {
    #[serde(rename = "Inflation & Rates")]
    InflationRates,
    #[serde(rename = "Growth & Demand")]
    GrowthDemand,
    #[serde(rename = "Labor & Wages")]
    LaborWages,
    #[serde(rename = "Credit & Risk")]
    CreditRisk,
    Sentiment,
    #[serde(rename = "Dollar & Liquidity")]
    DollarLiquidity,
}

impl Cluster {
    pub const ALL: [Cluster; 6] = [
        Cluster::InflationRates,
        Cluster::GrowthDemand,
        Cluster::LaborWages,
        Cluster::CreditRisk,
        Cluster::Sentiment,
        Cluster::DollarLiquidity,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Cluster::InflationRates => "Inflation & Rates",
            Cluster::GrowthDemand => "Growth & Demand",
            Cluster::LaborWages => "Labor & Wages",
            Cluster::CreditRisk => "Credit & Risk",
            Cluster::Sentiment => "Sentiment",
            Cluster::DollarLiquidity => "Dollar & Liquidity",
        }
    }

    /// Legacy categories a cluster covers, for results without a cluster tag.
    pub fn fallback_categories(&self) -> &'static [Category] {
        match self {
            Cluster::InflationRates => &[Category::FixedIncome, Category::Inflation],
            Cluster::GrowthDemand => &[Category::Growth],
            Cluster::LaborWages => &[Category::Labor],
            Cluster::CreditRisk => &[Category::Credit, Category::Market],
            Cluster::Sentiment => &[Category::Sentiment],
            Cluster::DollarLiquidity => &[Category::FixedIncome],
        }
    }
}

/// Economic role of an indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeTag {
    Inflation,
    InflationExpectation,
    PolicyRate,
    RealRate,
    YieldCurveSlope,
    CreditSpread,
    GrowthActivity,
    LaborQuantity,
    LaborSlack,
    WagesCosts,
    HousingActivity,
    HousingSlack,
    MortgageRate,
    Sentiment,
    VolatilityRiskOff,
    LendingStandards,
    FxIndex,
    Liquidity,
}

/// Defines how the indicator value should be labelled on display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    /// Percentage level (e.g., 4.26 -> "4.26%")
    Percent,
    /// Raw value as-is (e.g., sentiment index 98.4)
    Index,
    /// Large absolute level (e.g., payrolls, GDP)
    Level,
    /// Spreads shown in basis points
    BasisPoints,
}

impl UnitType {
    pub fn label(&self) -> &'static str {
        match self {
            UnitType::Percent => "%",
            UnitType::Index => "index",
            UnitType::Level => "level",
            UnitType::BasisPoints => "bp",
        }
    }
}

// ============================================================================
// CONFIG STRUCT
// ============================================================================

/// Static descriptor of one indicator in one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorConfig {
    pub series_id: String,
    pub name: String,
    pub region: Region,
    pub bucket: Bucket,
    pub category: Category,
    pub frequency: Frequency,
    pub method: TransformMethod,
    #[serde(default)]
    pub inverted: bool,
    pub type_tag: TypeTag,
    #[serde(default)]
    pub cluster: Option<Cluster>,
    #[serde(default)]
    pub unit: Option<UnitType>,
    #[serde(default)]
    pub hidden: bool,
    /// Shown for context only, never scored.
    #[serde(default)]
    pub contextual: bool,
}

// Helper macro to reduce boilerplate
macro_rules! ind {
    ($id:expr, $name:expr, $region:expr, $bucket:expr, $cat:expr, $freq:expr, $method:expr, $inv:expr, $tag:expr, $cluster:expr) => {
        IndicatorConfig {
            series_id: $id.to_string(),
            name: $name.to_string(),
            region: $region,
            bucket: $bucket,
            category: $cat,
            frequency: $freq,
            method: $method,
            inverted: $inv,
            type_tag: $tag,
            cluster: $cluster,
            unit: None,
            hidden: false,
            contextual: false,
        }
    };
    // US entries carry no cluster tag; they group through the category fallback
    ($id:expr, $name:expr, $region:expr, $bucket:expr, $cat:expr, $freq:expr, $method:expr, $inv:expr, $tag:expr) => {
        ind!($id, $name, $region, $bucket, $cat, $freq, $method, $inv, $tag, None)
    };
}

// ============================================================================
// STATIC INDICATOR TABLE (Lazy initialization)
// ============================================================================

static BUILTIN: Lazy<Registry> = Lazy::new(|| {
    use Bucket::*;
    use Category as C;
    use Frequency::*;
    use Region::*;
    use TransformMethod::*;
    use TypeTag as T;

    let mut configs = vec![
        // =====================================================================
        // US - LEADING
        // =====================================================================
        ind!("T10Y3M", "10Y-3M Yield Curve", Us, Leading, C::FixedIncome, Daily, Level, false, T::YieldCurveSlope),
        ind!("BAMLH0A0HYM2", "High Yield Spread", Us, Leading, C::FixedIncome, Daily, Level, false, T::CreditSpread),
        ind!("BAMLC0A4CBBB", "BBB Corporate Spread", Us, Leading, C::FixedIncome, Daily, Level, false, T::CreditSpread),
        ind!("T10YIEM", "10Y Breakeven Inflation", Us, Leading, C::FixedIncome, Daily, Level, false, T::InflationExpectation),
        ind!("DFII10", "10Y Real Rate (TIPS)", Us, Leading, C::FixedIncome, Daily, Level, false, T::RealRate),
        ind!("HOUST", "Housing Starts", Us, Leading, C::Housing, Monthly, Level, false, T::HousingActivity),
        ind!("MSACSR", "Months Supply New Houses", Us, Leading, C::Housing, Monthly, Level, false, T::HousingSlack),
        ind!("MANEMP", "ISM Manufacturing PMI", Us, Leading, C::Growth, Monthly, Level, false, T::GrowthActivity),
        ind!("NEWORDER", "ISM Manufacturing New Orders", Us, Leading, C::Growth, Monthly, Level, false, T::GrowthActivity),
        ind!("AWHMAN", "Avg Weekly Hours - Manufacturing", Us, Leading, C::Labor, Monthly, Level, false, T::LaborQuantity),
        ind!("UMCSENT", "Consumer Sentiment (U of M)", Us, Leading, C::Sentiment, Monthly, Level, false, T::Sentiment),
        ind!("DRTSCILM", "Bank Lending Standards", Us, Leading, C::Credit, Quarterly, Level, true, T::LendingStandards),
        ind!("VIXCLS", "VIX (Equity Volatility)", Us, Leading, C::Market, Daily, Level, true, T::VolatilityRiskOff),

        // =====================================================================
        // US - COINCIDENT
        // =====================================================================
        ind!("PAYEMS", "Nonfarm Payrolls", Us, Coincident, C::Labor, Monthly, Mom, false, T::LaborQuantity),
        ind!("INDPRO", "Industrial Production", Us, Coincident, C::Growth, Monthly, Level, false, T::GrowthActivity),
        ind!("RSXFS", "Retail Sales", Us, Coincident, C::Growth, Monthly, Yoy, false, T::GrowthActivity),
        ind!("PCECC96", "Real Personal Consumption", Us, Coincident, C::Growth, Quarterly, Yoy, false, T::GrowthActivity),
        ind!("DFF", "Federal Funds Rate", Us, Coincident, C::FixedIncome, Daily, Level, false, T::PolicyRate),
        ind!("SOFR", "SOFR", Us, Coincident, C::FixedIncome, Daily, Level, false, T::PolicyRate),
        ind!("MORTGAGE30US", "30Y Mortgage Rate", Us, Coincident, C::Housing, Weekly, Level, false, T::MortgageRate),
        ind!("RRPONTSYD", "Reverse Repo", Us, Coincident, C::FixedIncome, Daily, Level, false, T::Liquidity),
        ind!("DTWEXBGS", "Dollar Index", Us, Coincident, C::FixedIncome, Daily, Level, false, T::FxIndex),

        // =====================================================================
        // US - LAGGING
        // =====================================================================
        ind!("UNRATE", "Unemployment Rate", Us, Lagging, C::Labor, Monthly, Level, true, T::LaborSlack),
        ind!("CPIAUCSL", "CPI All Items", Us, Lagging, C::Inflation, Monthly, Yoy, false, T::Inflation),
        ind!("CPILFESL", "Core CPI", Us, Lagging, C::Inflation, Monthly, Yoy, false, T::Inflation),
        ind!("PCEPI", "PCE Price Index", Us, Lagging, C::Inflation, Monthly, Yoy, false, T::Inflation),
        ind!("PCEPILFE", "Core PCE", Us, Lagging, C::Inflation, Monthly, Yoy, false, T::Inflation),
        ind!("ECIWAG", "Employment Cost Index", Us, Lagging, C::Labor, Quarterly, Level, false, T::WagesCosts),

        // =====================================================================
        // EUROZONE - LEADING
        // =====================================================================
        ind!("IRSTCI01EZM156N", "1Y Euro Yield", Eurozone, Leading, C::FixedIncome, Monthly, Level, false, T::PolicyRate, Some(Cluster::InflationRates)),
        ind!("IRLTLT01EZM156N", "10Y Euro Long-Term Yield", Eurozone, Leading, C::FixedIncome, Monthly, Level, false, T::PolicyRate, Some(Cluster::InflationRates)),
        ind!("IRLTLT01DEM156N", "German 10Y Bund", Eurozone, Leading, C::FixedIncome, Monthly, Level, false, T::PolicyRate, Some(Cluster::InflationRates)),
        ind!("IRLTLT01FRM156N", "French 10Y OAT", Eurozone, Leading, C::FixedIncome, Monthly, Level, false, T::PolicyRate, Some(Cluster::InflationRates)),
        ind!("BAMLHE00EHYIEY", "Euro HY Corporate Spread", Eurozone, Leading, C::Credit, Daily, Level, false, T::CreditSpread, Some(Cluster::CreditRisk)),
        ind!("EUROSTAT_ESI_EA", "Economic Sentiment Index", Eurozone, Leading, C::Sentiment, Monthly, Level, false, T::Sentiment, Some(Cluster::Sentiment)),
        ind!("EUROSTAT_CCI_EA", "Consumer Confidence", Eurozone, Leading, C::Sentiment, Monthly, Level, false, T::Sentiment, Some(Cluster::Sentiment)),
        ind!("EA_INDUSTRIAL_CONF", "Industrial Confidence (EA)", Eurozone, Leading, C::Sentiment, Monthly, Level, false, T::Sentiment, Some(Cluster::Sentiment)),

        // =====================================================================
        // EUROZONE - COINCIDENT
        // =====================================================================
        ind!("LRHUTTTTEA156S", "Unemployment Rate (EUR)", Eurozone, Coincident, C::Labor, Monthly, Level, true, T::LaborSlack, Some(Cluster::LaborWages)),
        ind!("EA19PRINTO01IXOBM", "Industrial Production (EUR)", Eurozone, Coincident, C::Growth, Monthly, Yoy, false, T::GrowthActivity, Some(Cluster::GrowthDemand)),
        ind!("NAEXKP01EZQ657S", "Real GDP (EA)", Eurozone, Coincident, C::Growth, Quarterly, Level, false, T::GrowthActivity, Some(Cluster::GrowthDemand)),
        ind!("VXEEMCLS", "EM Volatility Index", Eurozone, Coincident, C::Market, Daily, Level, true, T::VolatilityRiskOff, Some(Cluster::CreditRisk)),

        // =====================================================================
        // EUROZONE - LAGGING
        // =====================================================================
        ind!("CP0000EZ19M086NEST", "HICP All Items", Eurozone, Lagging, C::Inflation, Monthly, Yoy, false, T::Inflation, Some(Cluster::InflationRates)),
        ind!("EA_WAGE_GROWTH", "Labor Cost Index (EUR)", Eurozone, Lagging, C::Labor, Quarterly, Yoy, false, T::WagesCosts, Some(Cluster::LaborWages)),
        ind!("ECBDFR", "ECB Deposit Rate", Eurozone, Lagging, C::FixedIncome, Irregular, Level, false, T::PolicyRate, Some(Cluster::InflationRates)),
    ];

    // Context-only series: displayed, never scored
    let mut dgs1 = ind!("DGS1", "US 1Y Treasury", Us, Leading, C::FixedIncome, Daily, Level, false, T::PolicyRate);
    dgs1.contextual = true;
    let mut sp500 = ind!("SP500", "S&P 500 (YoY %)", Us, Leading, C::FinancialConditions, Daily, Yoy, false, T::GrowthActivity);
    sp500.contextual = true;
    let mut curve = ind!("US_YIELD_CURVE", "US Yield Curve (1Y-10Y)", Us, Leading, C::FixedIncome, Daily, Level, false, T::YieldCurveSlope);
    curve.unit = Some(UnitType::BasisPoints);
    let mut hicp_headline = ind!("EA_HICP_HEADLINE", "HICP Headline (EUR)", Eurozone, Lagging, C::Inflation, Monthly, Level, false, T::Inflation, Some(Cluster::InflationRates));
    hicp_headline.hidden = true;

    configs.extend([dgs1, sp500, curve, hicp_headline]);

    Registry { configs }
});

// ============================================================================
// REGISTRY API
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    configs: Vec<IndicatorConfig>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ConfigTable {
    List(Vec<IndicatorConfig>),
    Keyed(BTreeMap<String, VersionedConfig>),
}

#[derive(Debug, Serialize)]
pub struct RegistryStats {
    pub total: usize,
    pub scored: usize,
    pub leading: usize,
    pub coincident: usize,
    pub lagging: usize,
}

impl Registry {
    /// Built-in US and Eurozone table.
    pub fn builtin() -> &'static Registry {
        &BUILTIN
    }

    /// One config per (series_id, region). Later duplicates replace earlier ones.
    pub fn from_configs(configs: Vec<IndicatorConfig>) -> Self {
        let mut registry = Registry::default();
        for config in configs {
            registry.insert(config);
        }
        registry
    }

    /// Load a custom table. Accepts a JSON array of current configs, or an
    /// object keyed by series id whose records may use either schema; old
    /// records are translated on load.
    pub fn from_json(raw: &str) -> Result<Self> {
        let table: ConfigTable =
            serde_json::from_str(raw).context("Failed to parse indicator config table")?;

        let configs = match table {
            ConfigTable::List(configs) => configs,
            ConfigTable::Keyed(records) => records
                .into_iter()
                .map(|(series_id, record)| record.into_current(&series_id))
                .collect(),
        };
        Ok(Self::from_configs(configs))
    }

    pub fn insert(&mut self, config: IndicatorConfig) {
        match self
            .configs
            .iter_mut()
            .find(|c| c.series_id == config.series_id && c.region == config.region)
        {
            Some(existing) => *existing = config,
            None => self.configs.push(config),
        }
    }

    pub fn get_config(&self, series_id: &str, region: Region) -> Option<&IndicatorConfig> {
        self.configs
            .iter()
            .find(|c| c.series_id == series_id && c.region == region)
    }

    /// First config with this id in any region.
    pub fn find(&self, series_id: &str) -> Option<&IndicatorConfig> {
        self.configs.iter().find(|c| c.series_id == series_id)
    }

    pub fn all(&self) -> &[IndicatorConfig] {
        &self.configs
    }

    pub fn configs_for_region(&self, region: Region) -> Vec<&IndicatorConfig> {
        self.configs.iter().filter(|c| c.region == region).collect()
    }

    /// Configs that may be displayed (not hidden).
    pub fn visible(&self) -> Vec<&IndicatorConfig> {
        self.configs.iter().filter(|c| !c.hidden).collect()
    }

    pub fn get_stats(&self) -> RegistryStats {
        let count_bucket = |b: Bucket| self.configs.iter().filter(|c| c.bucket == b).count();
        RegistryStats {
            total: self.configs.len(),
            scored: self.configs.iter().filter(|c| !c.hidden && !c.contextual).count(),
            leading: count_bucket(Bucket::Leading),
            coincident: count_bucket(Bucket::Coincident),
            lagging: count_bucket(Bucket::Lagging),
        }
    }
}
