use super::*;
use tempfile::TempDir;

#[test]
fn default_config_is_valid() {
    let config = Config::default();
    assert!(config.validate().is_ok());
}

#[test]
fn missing_config_file_yields_defaults() {
    let dir = TempDir::new().expect("should create temp dir");

    let config = Config::load_from(dir.path()).expect("should load");

    assert_eq!(config.embedding, EmbeddingConfig::default());
    assert_eq!(config.base_dir, dir.path());
}

#[test]
fn save_and_reload_roundtrip() {
    let dir = TempDir::new().expect("should create temp dir");
    let mut config = Config {
        base_dir: dir.path().to_path_buf(),
        ..Config::default()
    };
    config.embedding.model = "all-minilm:latest".to_string();
    config.guardrail.threshold = 0.4;
    config.server.port = 9000;

    config.save().expect("should save");
    let reloaded = Config::load_from(dir.path()).expect("should reload");

    assert_eq!(reloaded.embedding.model, "all-minilm:latest");
    assert_eq!(reloaded.guardrail.threshold, 0.4);
    assert_eq!(reloaded.server.port, 9000);
}

#[test]
fn invalid_file_is_rejected_on_load() {
    let dir = TempDir::new().expect("should create temp dir");
    std::fs::write(
        dir.path().join("config.toml"),
        "[guardrail]\nthreshold = 1.5\n",
    )
    .expect("should write config");

    assert!(Config::load_from(dir.path()).is_err());
}

#[test]
fn threshold_bounds_are_enforced() {
    let mut config = Config::default();

    config.guardrail.threshold = 0.0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidThreshold(_))
    ));

    config.guardrail.threshold = 1.0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidThreshold(_))
    ));

    config.guardrail.threshold = 0.3;
    assert!(config.validate().is_ok());
}

#[test]
fn embedding_validation() {
    let mut config = EmbeddingConfig::default();
    assert!(config.validate().is_ok());

    config.protocol = "ftp".to_string();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidProtocol(_))
    ));

    config = EmbeddingConfig {
        model: "   ".to_string(),
        ..EmbeddingConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidModel(_))
    ));

    config = EmbeddingConfig {
        batch_size: 0,
        ..EmbeddingConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidBatchSize(_))
    ));

    config = EmbeddingConfig {
        port: 0,
        ..EmbeddingConfig::default()
    };
    assert!(matches!(config.validate(), Err(ConfigError::InvalidPort(_))));
}

#[test]
fn top_k_bounds_are_enforced() {
    let mut config = Config::default();

    config.server.top_k = 0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidTopK(_))
    ));

    config.server.top_k = 101;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidTopK(_))
    ));
}

#[test]
fn disabled_speech_skips_url_validation() {
    let mut config = Config::default();
    config.speech = SpeechConfig {
        enabled: false,
        tts_url: "not a url".to_string(),
        ..SpeechConfig::default()
    };

    assert!(config.validate().is_ok());

    config.speech.enabled = true;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidUrl(_))
    ));
}

#[test]
fn relative_paths_resolve_against_config_dir() {
    let dir = TempDir::new().expect("should create temp dir");
    let config = Config {
        base_dir: dir.path().to_path_buf(),
        ..Config::default()
    };

    assert_eq!(config.corpus_path(), dir.path().join("corpus.txt"));
    assert_eq!(config.samples_path(), dir.path().join("guardrail.toml"));
}

#[test]
fn absolute_paths_are_kept() {
    let mut config = Config::default();
    config.corpus.path = PathBuf::from("/data/transcript.txt");

    assert_eq!(config.corpus_path(), PathBuf::from("/data/transcript.txt"));
}

#[test]
fn guardrail_embedding_falls_back_to_primary_model() {
    let mut config = Config::default();
    assert_eq!(
        config.guardrail_embedding().model,
        config.embedding.model
    );

    config.guardrail.model = Some("all-minilm:latest".to_string());
    assert_eq!(config.guardrail_embedding().model, "all-minilm:latest");
    assert_eq!(config.guardrail_embedding().host, config.embedding.host);
}
