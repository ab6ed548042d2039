//! アダプター設定

use super::utils::get_bool_env;

/// 環境へ渡すサーバー特性の設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterConfig {
    /// `rack.multithread`
    pub multithread: bool,
    /// `rack.multiprocess`
    pub multiprocess: bool,
    /// `rack.run_once`
    pub run_once: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            multithread: true,
            multiprocess: false,
            run_once: false,
        }
    }
}

impl AdapterConfig {
    /// 環境変数から設定を読み込む（未設定・不正値はデフォルト）
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            multithread: get_bool_env("RACKBRIDGE_MULTITHREAD", default.multithread),
            multiprocess: get_bool_env("RACKBRIDGE_MULTIPROCESS", default.multiprocess),
            run_once: get_bool_env("RACKBRIDGE_RUN_ONCE", default.run_once),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use temp_env::with_vars;

    #[test]
    fn test_from_env_defaults() {
        with_vars([
            ("RACKBRIDGE_MULTITHREAD", None::<&str>),
            ("RACKBRIDGE_MULTIPROCESS", None),
            ("RACKBRIDGE_RUN_ONCE", None),
        ], || {
            assert_eq!(AdapterConfig::from_env(), AdapterConfig::default());
        });
    }

    #[test]
    fn test_from_env_overrides() {
        with_vars([
            ("RACKBRIDGE_MULTITHREAD", Some("false")),
            ("RACKBRIDGE_MULTIPROCESS", Some("true")),
            ("RACKBRIDGE_RUN_ONCE", Some("1")),
        ], || {
            let config = AdapterConfig::from_env();
            assert!(!config.multithread);
            assert!(config.multiprocess);
            assert!(config.run_once);
        });
    }
}
