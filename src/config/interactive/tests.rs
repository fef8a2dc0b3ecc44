use super::load_existing_config as load_existing_config_impl;

#[test]
fn load_existing_config() {
    let config = load_existing_config_impl().expect("config loaded successfully");
    assert!(!config.fetch.user_agent.is_empty());
    assert!(config.fetch.max_retries > 0);
    assert!(!config.sources.books_url.is_empty());
    assert!(config.sources.default_limit > 0);
}
