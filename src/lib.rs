//! # popsweep
//!
//! YAML-defined browser test suites with a background popup sweeper. Each
//! scenario's setup hook arms a poll that clicks away a cookie banner or
//! entry modal whenever it shows up, while the scenario's steps run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use popsweep::{Config, Runner};
//!
//! # #[tokio::main]
//! # async fn main() -> popsweep::Result<()> {
//! let config = Config::load("configs/the-internet.yaml")?;
//! let runner = Runner::launch(&config.browser).await?;
//! let report = runner.run(&config).await?;
//! println!("Success: {}", report.success());
//! runner.close().await?;
//! # Ok(())
//! # }
//! ```

mod browser;
mod config;
mod runner;

pub use browser::{EokaDriver, EokaElement};
pub use config::{
    BrowserConfig, Config, DismissConfig, HookScope, JoinPoint, ParamDef, Params, Scenario, Step,
};
pub use runner::{Runner, ScenarioReport, SuiteReport};

pub use popsweep_resolver as resolver;

/// Result type for popsweep operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during config loading or execution.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),

    #[error("driver error: {0}")]
    Driver(#[from] resolver::DriverError),

    #[error("{0}")]
    Resolver(#[from] resolver::Error),

    #[error("step failed: {0}")]
    StepFailed(String),

    #[error("assertion failed: {0}")]
    AssertionFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r#"
name: "Test"
scenarios:
  - name: "opens"
    steps:
      - visit:
          url: "https://example.com"
"#;
        let config = Config::parse(yaml).unwrap();
        assert_eq!(config.name, "Test");
        assert_eq!(config.scenarios.len(), 1);
        assert!(config.dismiss.is_none());
        assert!(config.base_url.is_none());
        assert!(!config.browser.headless);
    }

    #[test]
    fn test_parse_browser_config() {
        let yaml = r#"
name: "Test"
browser:
  headless: true
  proxy: "http://localhost:8080"
  user_agent: "Custom UA"
  viewport:
    width: 1920
    height: 1080
scenarios:
  - name: "noop"
"#;
        let config = Config::parse(yaml).unwrap();
        assert!(config.browser.headless);
        assert_eq!(config.browser.proxy, Some("http://localhost:8080".into()));
        assert_eq!(config.browser.user_agent, Some("Custom UA".into()));
        let viewport = config.browser.viewport.unwrap();
        assert_eq!(viewport.width, 1920);
        assert_eq!(viewport.height, 1080);
    }

    #[test]
    fn test_parse_dismiss_defaults() {
        let yaml = r##"
name: "Test"
dismiss:
  locator: "#modal .modal-footer p"
scenarios:
  - name: "noop"
"##;
        let config = Config::parse(yaml).unwrap();
        let dismiss = config.dismiss.unwrap();
        assert_eq!(dismiss.locator.as_str(), "#modal .modal-footer p");
        assert_eq!(dismiss.interval_ms, 2000);
        assert_eq!(dismiss.timeout_ms, None);
        assert!(dismiss.probe_immediately);
        assert_eq!(dismiss.scope, HookScope::Scenario);
        assert_eq!(dismiss.join, JoinPoint::Background);
        assert!(!dismiss.required);

        let options = dismiss.poll_options();
        assert_eq!(options.interval.as_millis(), 2000);
        assert!(options.timeout.is_none());
    }

    #[test]
    fn test_parse_dismiss_full() {
        let yaml = r##"
name: "Test"
dismiss:
  locator: "#modal .footer button"
  interval_ms: 500
  timeout_ms: 8000
  probe_immediately: false
  scope: suite
  join: before_steps
  required: true
scenarios:
  - name: "noop"
"##;
        let dismiss = Config::parse(yaml).unwrap().dismiss.unwrap();
        assert_eq!(dismiss.interval_ms, 500);
        assert_eq!(dismiss.timeout_ms, Some(8000));
        assert!(!dismiss.probe_immediately);
        assert_eq!(dismiss.scope, HookScope::Suite);
        assert_eq!(dismiss.join, JoinPoint::BeforeSteps);
        assert!(dismiss.required);
        assert!(!dismiss.poll_options().probe_immediately);
    }

    #[test]
    fn test_parse_steps() {
        let yaml = r##"
name: "Test"
scenarios:
  - name: "everything"
    steps:
      - visit:
          url: "login"
      - visit_any:
          urls: ["entry_ad", "floating_menu"]
      - wait:
          seconds: 1.5
      - wait:
          ms: 250
      - click:
          selector: "button[type=\"submit\"]"
      - try_click:
          selector: ".optional"
      - fill:
          selector: "#username"
          value: "tomsmith"
      - assert_present:
          selector: "#flash.success"
      - assert_absent:
          selector: "#modal"
      - assert_url:
          contains: "/secure"
      - log:
          message: "done"
      - settle_popup
      - repeat:
          times: 2
          steps:
            - wait:
                ms: 10
"##;
        let config = Config::parse(yaml).unwrap();
        let steps = &config.scenarios[0].steps;
        assert_eq!(steps.len(), 13);

        assert!(matches!(steps[0], Step::Visit(_)));
        if let Step::VisitAny(s) = &steps[1] {
            assert_eq!(s.urls, vec!["entry_ad".to_string(), "floating_menu".to_string()]);
        } else {
            panic!("Expected VisitAny step");
        }
        if let Step::Wait(s) = &steps[2] {
            assert_eq!(s.duration_ms(), 1500);
        } else {
            panic!("Expected Wait step");
        }
        if let Step::Fill(s) = &steps[6] {
            assert_eq!(s.selector.as_str(), "#username");
            assert_eq!(s.value, "tomsmith");
        } else {
            panic!("Expected Fill step");
        }
        if let Step::SettlePopup(s) = &steps[11] {
            assert!(!s.required);
        } else {
            panic!("Expected SettlePopup step");
        }
        if let Step::Repeat(s) = &steps[12] {
            assert_eq!(s.times, 2);
            assert_eq!(s.steps.len(), 1);
        } else {
            panic!("Expected Repeat step");
        }
    }

    #[test]
    fn test_parse_unknown_step() {
        let yaml = r#"
name: "Test"
scenarios:
  - name: "bad"
    steps:
      - teleport:
          to: "mars"
"#;
        let err = Config::parse(yaml).unwrap_err();
        assert!(err.to_string().contains("teleport"), "{}", err);
    }

    #[test]
    fn test_parse_on_failure() {
        let yaml = r#"
name: "Test"
scenarios:
  - name: "noop"
on_failure:
  screenshot: "error-{timestamp}.png"
  retry:
    attempts: 3
    delay_ms: 1000
"#;
        let config = Config::parse(yaml).unwrap();
        let on_failure = config.on_failure.unwrap();
        assert_eq!(on_failure.screenshot, Some("error-{timestamp}.png".into()));
        let retry = on_failure.retry.unwrap();
        assert_eq!(retry.attempts, 3);
        assert_eq!(retry.delay_ms, 1000);
    }

    #[test]
    fn test_validation_missing_name() {
        let yaml = r#"
scenarios:
  - name: "noop"
"#;
        assert!(Config::parse(yaml).is_err());
    }

    #[test]
    fn test_validation_empty_name() {
        let yaml = r#"
name: ""
scenarios:
  - name: "noop"
"#;
        assert!(Config::parse(yaml).is_err());
    }

    #[test]
    fn test_validation_no_scenarios() {
        let yaml = r#"
name: "Test"
"#;
        let err = Config::parse(yaml).unwrap_err();
        assert!(err.to_string().contains("scenario"), "{}", err);
    }

    #[test]
    fn test_validation_empty_locator() {
        let yaml = r#"
name: "Test"
dismiss:
  locator: ""
scenarios:
  - name: "noop"
"#;
        assert!(Config::parse(yaml).is_err());
    }

    #[test]
    fn test_validation_zero_interval() {
        let yaml = r##"
name: "Test"
dismiss:
  locator: "#modal"
  interval_ms: 0
scenarios:
  - name: "noop"
"##;
        let err = Config::parse(yaml).unwrap_err();
        assert!(err.to_string().contains("interval_ms"), "{}", err);
    }

    #[test]
    fn test_validation_required_needs_timeout() {
        let yaml = r##"
name: "Test"
dismiss:
  locator: "#modal"
  required: true
scenarios:
  - name: "noop"
"##;
        let err = Config::parse(yaml).unwrap_err();
        assert!(err.to_string().contains("timeout_ms"), "{}", err);
    }

    #[test]
    fn test_validation_settle_step_needs_timeout() {
        let yaml = r##"
name: "Test"
dismiss:
  locator: "#modal"
scenarios:
  - name: "joins"
    steps:
      - repeat:
          times: 1
          steps:
            - settle_popup
"##;
        let err = Config::parse(yaml).unwrap_err();
        assert!(err.to_string().contains("settle_popup"), "{}", err);
    }

    #[test]
    fn test_validation_wait_needs_one_unit() {
        let yaml = r#"
name: "Test"
scenarios:
  - name: "waits"
    steps:
      - wait:
          ms: 100
          seconds: 1
"#;
        assert!(Config::parse(yaml).is_err());
    }

    #[test]
    fn test_validation_zero_retry_attempts() {
        let yaml = r#"
name: "Test"
scenarios:
  - name: "noop"
on_failure:
  retry:
    attempts: 0
    delay_ms: 1000
"#;
        let err = Config::parse(yaml).unwrap_err();
        assert!(err.to_string().contains("at least 1"));
    }

    #[test]
    fn test_params_substitution() {
        let yaml = r##"
name: "Login"
params:
  username:
    required: true
  password:
    required: true
scenarios:
  - name: "login"
    steps:
      - fill:
          selector: "#username"
          value: "${username}"
      - fill:
          selector: "#password"
          value: "${password}"
"##;
        let params = Params::new()
            .set("username", "tomsmith")
            .set("password", "SuperSecretPassword!");
        let config = Config::parse_with_params(yaml, &params).unwrap();

        if let Step::Fill(s) = &config.scenarios[0].steps[1] {
            assert_eq!(s.value, "SuperSecretPassword!");
        } else {
            panic!("Expected Fill step");
        }
    }

    #[test]
    fn test_params_in_base_url_and_locator() {
        let yaml = r##"
name: "Test"
params:
  host:
    default: "the-internet.herokuapp.com"
  popup:
    default: "#modal .modal-footer p"
base_url: "https://${host}"
dismiss:
  locator: "${popup}"
scenarios:
  - name: "noop"
"##;
        let config = Config::parse(yaml).unwrap();
        assert_eq!(
            config.base_url.as_deref(),
            Some("https://the-internet.herokuapp.com")
        );
        assert_eq!(
            config.dismiss.unwrap().locator.as_str(),
            "#modal .modal-footer p"
        );
    }

    #[test]
    fn test_params_missing_required() {
        let yaml = r##"
name: "Test"
params:
  api_key:
    required: true
base_url: "https://example.com/${api_key}"
scenarios:
  - name: "noop"
"##;
        let err = Config::parse(yaml).unwrap_err();
        assert!(err.to_string().contains("api_key"));
    }

    #[test]
    fn test_locator_override_rechecks_settle_steps() {
        let yaml = r#"
name: "Test"
scenarios:
  - name: "joins"
    steps:
      - settle_popup
"#;
        let mut config = Config::parse(yaml).unwrap();
        let locator = resolver::Locator::new("#modal .modal-footer p").unwrap();

        // Creating an unbounded sweeper would leave settle_popup waiting forever.
        let err = config
            .override_dismiss(Some(locator.clone()), None, None)
            .unwrap_err();
        assert!(err.to_string().contains("settle_popup"), "{}", err);

        let mut config = Config::parse(yaml).unwrap();
        config
            .override_dismiss(Some(locator), Some(500), Some(3000))
            .unwrap();
        let dismiss = config.dismiss.unwrap();
        assert_eq!(dismiss.interval_ms, 500);
        assert_eq!(dismiss.timeout_ms, Some(3000));
    }

    #[test]
    fn test_timing_override_keeps_config_locator() {
        let yaml = r##"
name: "Test"
dismiss:
  locator: "#cookie-banner button"
  timeout_ms: 8000
  required: true
scenarios:
  - name: "noop"
"##;
        let mut config = Config::parse(yaml).unwrap();
        config.override_dismiss(None, Some(250), None).unwrap();
        let dismiss = config.dismiss.as_ref().unwrap();
        assert_eq!(dismiss.locator.as_str(), "#cookie-banner button");
        assert_eq!(dismiss.interval_ms, 250);
        assert_eq!(dismiss.timeout_ms, Some(8000));

        assert!(config.override_dismiss(None, Some(0), None).is_err());
    }

    #[test]
    fn test_timing_override_without_dismiss_rejected() {
        let yaml = r#"
name: "Test"
scenarios:
  - name: "noop"
"#;
        let mut config = Config::parse(yaml).unwrap();
        assert!(config.override_dismiss(None, None, Some(1000)).is_err());
        assert!(config.override_dismiss(None, None, None).is_ok());
        assert!(config.dismiss.is_none());
    }

    #[test]
    fn test_load_demo_config() {
        let config = Config::load("configs/the-internet.yaml").unwrap();
        assert_eq!(config.name, "the-internet");
        assert_eq!(
            config.base_url.as_deref(),
            Some("https://the-internet.herokuapp.com")
        );
        assert_eq!(
            config.dismiss.unwrap().locator.as_str(),
            "#modal .modal-footer p"
        );
        assert_eq!(config.scenarios.len(), 2);
    }
}
