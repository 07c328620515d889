pub mod calibration;
pub mod config;
pub mod engines;
pub mod error;
pub mod export;
pub mod integration;
pub mod logging;
pub mod market_log;
pub mod paths;
pub mod team_profiles;

pub use calibration::{
    CalibrationAccumulator, CalibrationContext, CalibrationSummary, GameCalibrationInput,
    GameCalibrationResult, compute_game_calibration,
};
pub use config::ModelConfig;
pub use engines::{EngineId, EngineOutput, RiskFlag};
pub use error::{ExportError, MarketLogError, ModelError};
pub use integration::{Confidence, IntegratedState, IntegrationEngine, MatchupContext, PredictionResult};
pub use team_profiles::{TeamProfile, TeamProfileStore};
