use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::warn;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct BaliseConfig {
    /// Intervalle entre deux cycles de publication (secondes, > 0)
    pub tick_seconds: u64,
    /// Taille du canal de mesures entre scanner et ingestion
    pub scanner_buffer: usize,
    /// Port de l'API HTTP
    pub http_port: u16,
    /// Sorties activées, dans l'ordre (ex: ["log", "http"])
    pub outputs: Vec<String>,
    /// Destination du publisher http (BALISE_PUBLISHER_HTTP_URI prime)
    pub publisher_http_uri: Option<String>,
    pub scan: ScanConf,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ScanConf {
    /// Intervalle d'émission du scanner simulé (secondes, > 0)
    pub interval_seconds: u64,
    /// Identités des balises simulées
    pub devices: Vec<String>,
}

impl Default for BaliseConfig {
    fn default() -> Self {
        Self {
            tick_seconds: 60,
            scanner_buffer: 10,
            http_port: 8080,
            outputs: vec!["log".to_string()],
            publisher_http_uri: None,
            scan: ScanConf::default(),
        }
    }
}

impl Default for ScanConf {
    fn default() -> Self {
        Self {
            interval_seconds: 5,
            devices: vec![
                "fa:ke:ba:11:5e:01".to_string(),
                "fa:ke:ba:11:5e:02".to_string(),
            ],
        }
    }
}

impl BaliseConfig {
    /// URI de destination du publisher http : la variable d'environnement
    /// BALISE_PUBLISHER_HTTP_URI prime sur le fichier de config.
    pub fn http_destination(&self) -> Option<String> {
        std::env::var("BALISE_PUBLISHER_HTTP_URI")
            .ok()
            .filter(|uri| !uri.is_empty())
            .or_else(|| self.publisher_http_uri.clone())
    }
}

pub async fn load_config() -> BaliseConfig {
    let path = std::env::var("BALISE_KERNEL_CONFIG").unwrap_or_else(|_| "balise.yaml".into());
    load_config_from(&path).await
}

pub async fn load_config_from(path: &str) -> BaliseConfig {
    let cfg = if Path::new(path).exists() {
        let txt = fs::read_to_string(path).await.unwrap_or_default();
        if txt.trim().is_empty() {
            BaliseConfig::default()
        } else {
            serde_yaml::from_str(&txt).unwrap_or_else(|e| {
                warn!("config invalide: {e}");
                BaliseConfig::default()
            })
        }
    } else {
        warn!("pas de {path}, usage config par défaut");
        BaliseConfig::default()
    };
    sanitize(cfg)
}

fn sanitize(mut cfg: BaliseConfig) -> BaliseConfig {
    if cfg.tick_seconds == 0 {
        warn!("tick_seconds doit être > 0, retour à 60");
        cfg.tick_seconds = 60;
    }
    if cfg.scanner_buffer == 0 {
        warn!("scanner_buffer doit être > 0, retour à 10");
        cfg.scanner_buffer = 10;
    }
    if cfg.scan.interval_seconds == 0 {
        warn!("scan.interval_seconds doit être > 0, retour à 5");
        cfg.scan.interval_seconds = 5;
    }
    cfg
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_the_documented_values() {
        let cfg = BaliseConfig::default();
        assert_eq!(cfg.tick_seconds, 60);
        assert_eq!(cfg.scanner_buffer, 10);
        assert_eq!(cfg.http_port, 8080);
        assert_eq!(cfg.outputs, vec!["log"]);
        assert!(cfg.publisher_http_uri.is_none());
        assert_eq!(cfg.scan.interval_seconds, 5);
        assert_eq!(cfg.scan.devices.len(), 2);
    }

    #[tokio::test]
    async fn loads_a_complete_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
tick_seconds: 15
scanner_buffer: 4
http_port: 9000
outputs: ["log", "http"]
publisher_http_uri: "http://collector.local/ingest"
scan:
  interval_seconds: 2
  devices: ["aa:bb"]
"#
        )
        .unwrap();

        let cfg = load_config_from(file.path().to_str().unwrap()).await;
        assert_eq!(cfg.tick_seconds, 15);
        assert_eq!(cfg.scanner_buffer, 4);
        assert_eq!(cfg.http_port, 9000);
        assert_eq!(cfg.outputs, vec!["log", "http"]);
        assert_eq!(
            cfg.publisher_http_uri.as_deref(),
            Some("http://collector.local/ingest")
        );
        assert_eq!(cfg.scan.devices, vec!["aa:bb"]);
    }

    #[tokio::test]
    async fn partial_yaml_falls_back_to_defaults_per_field() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "tick_seconds: 5").unwrap();

        let cfg = load_config_from(file.path().to_str().unwrap()).await;
        assert_eq!(cfg.tick_seconds, 5);
        assert_eq!(cfg.http_port, 8080);
        assert_eq!(cfg.outputs, vec!["log"]);
    }

    #[tokio::test]
    async fn invalid_yaml_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, ": : :").unwrap();

        let cfg = load_config_from(file.path().to_str().unwrap()).await;
        assert_eq!(cfg.tick_seconds, 60);
    }

    #[tokio::test]
    async fn missing_file_falls_back_to_defaults() {
        let cfg = load_config_from("/nonexistent/balise.yaml").await;
        assert_eq!(cfg.http_port, 8080);
    }

    #[tokio::test]
    async fn zero_intervals_are_rejected_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
tick_seconds: 0
scanner_buffer: 0
scan:
  interval_seconds: 0
"#
        )
        .unwrap();

        let cfg = load_config_from(file.path().to_str().unwrap()).await;
        assert_eq!(cfg.tick_seconds, 60);
        assert_eq!(cfg.scanner_buffer, 10);
        assert_eq!(cfg.scan.interval_seconds, 5);
    }

    // seul test du binaire à modifier BALISE_PUBLISHER_HTTP_URI
    #[test]
    fn environment_overrides_config_for_http_destination() {
        let cfg = BaliseConfig {
            publisher_http_uri: Some("http://collector.local/ingest".to_string()),
            ..BaliseConfig::default()
        };

        std::env::set_var("BALISE_PUBLISHER_HTTP_URI", "http://env.local/ingest");
        assert_eq!(
            cfg.http_destination().as_deref(),
            Some("http://env.local/ingest")
        );

        // variable vide = non configurée
        std::env::set_var("BALISE_PUBLISHER_HTTP_URI", "");
        assert_eq!(
            cfg.http_destination().as_deref(),
            Some("http://collector.local/ingest")
        );

        std::env::remove_var("BALISE_PUBLISHER_HTTP_URI");
        assert_eq!(
            cfg.http_destination().as_deref(),
            Some("http://collector.local/ingest")
        );
    }
}
