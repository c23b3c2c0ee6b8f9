pub mod advanced;
pub mod exploration;

pub use advanced::{
    classify_days, verdict, AdvancedAnalyzer, AdvancedReport, CategoryDistribution,
    DailyClassification, Exceedance, RfmSummary, Verdict, YearlyRecapRow,
};
pub use exploration::{
    ExplorationAnalyzer, ExplorationReport, Insight, InsightTopic, RainSection,
    NO_MET_VARIABLE_NOTICE,
};
