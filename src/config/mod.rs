pub mod params;
pub mod schema;
pub mod steps;

pub use params::{ParamDef, Params};
pub use schema::{BrowserConfig, Config, DismissConfig, HookScope, JoinPoint, Scenario};
pub use steps::Step;
