#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use aimodels_discover::config::Config;
use tempfile::TempDir;

/// Twelve models. Default order (runs desc, missing last):
/// 1, 7, 6, 3, 4, 12, 8, 2, 5, 11, 10, 9.
pub const MODELS_JSON: &str = r#"[
  {"id": "1", "modelName": "stable-diffusion", "creator": "stability-ai", "runs": 110000000, "tags": ["Text-to-Image"]},
  {"id": "2", "modelName": "stable-video-diffusion", "creator": "stability-ai", "runs": 2500000, "tags": ["Image-to-Video"]},
  {"id": "3", "modelName": "whisper", "creator": "openai", "runs": 45000000, "tags": ["Audio-to-Text"]},
  {"id": "4", "modelName": "llama-2-70b-chat", "creator": "meta", "runs": 9000000, "tags": ["Text-to-Text"]},
  {"id": "5", "modelName": "musicgen", "creator": "meta", "runs": 1700000, "tags": ["Text-to-Audio"]},
  {"id": "6", "modelName": "sdxl", "creator": "stability-ai", "runs": 60000000, "tags": ["Text-to-Image", "Image-to-Image"]},
  {"id": "7", "modelName": "blip", "creator": "salesforce", "runs": 80000000, "tags": ["Image-to-Text"]},
  {"id": "8", "modelName": "controlnet", "creator": "lllyasviel", "runs": 3000000, "tags": ["Image-to-Image"]},
  {"id": "9", "modelName": "Stable-Cascade", "creator": "stability-ai", "tags": ["Text-to-Image"]},
  {"id": "10", "modelName": "codellama-34b", "creator": "meta", "runs": 500000, "tags": ["Text-to-Text"]},
  {"id": "11", "modelName": "bark", "creator": "suno-ai", "runs": 1200000, "tags": ["Text-to-Audio"]},
  {"id": "12", "modelName": "kandinsky-2.2", "creator": "ai-forever", "runs": 7000000, "tags": ["Text-to-Image"]}
]"#;

pub const PAPERS_JSON: &str = r#"{"data": [
  {"id": "2401.00001", "title": "Scaling Laws Revisited", "totalScore": 42.5, "tags": ["cs.LG"]},
  {"id": "2401.00002", "title": "Diffusion Models Beat GANs Again", "totalScore": 87, "tags": ["cs.CV", "cs.LG"]},
  {"id": "2401.00003", "title": "Speech Recognition at Scale", "totalScore": 13, "tags": ["cs.SD"]}
]}"#;

/// Temp dir with `config/discover.toml`, `models.json` and `papers.json`.
pub fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(root.join("models.json"), MODELS_JSON).unwrap();
    fs::write(root.join("papers.json"), PAPERS_JSON).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/discover.sqlite"

[listing]
page_size = 10
max_page_size = 50
"#,
        root.display()
    );
    let config_path = config_dir.join("discover.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

pub fn test_config(root: &Path, port: u16) -> Config {
    let mut config = Config::with_db_path(root.join("data").join("discover.sqlite"));
    config.server.bind = format!("127.0.0.1:{}", port);
    config
}

pub fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

pub async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}
