#[cfg(test)]
mod tests {
    use super::super::*;

    #[test]
    fn test_static_token() {
        let source = StaticTokenSource::new("ya29.token");
        assert_eq!(source.token().unwrap(), "ya29.token");
    }

    #[test]
    fn test_env_token_first_non_empty_wins() {
        std::env::set_var("DISCO_TEST_TOKEN_EMPTY", "  ");
        std::env::set_var("DISCO_TEST_TOKEN_SET", " ya29.env \n");

        let source = EnvTokenSource::new(vec![
            "DISCO_TEST_TOKEN_UNSET".to_string(),
            "DISCO_TEST_TOKEN_EMPTY".to_string(),
            "DISCO_TEST_TOKEN_SET".to_string(),
        ]);
        assert_eq!(source.token().unwrap(), "ya29.env");
    }

    #[test]
    fn test_env_token_missing() {
        let source = EnvTokenSource::new(vec!["DISCO_TEST_TOKEN_NEVER_SET".to_string()]);
        let err = source.token().unwrap_err();
        assert!(err.to_string().contains("DISCO_TEST_TOKEN_NEVER_SET"));
    }

    #[test]
    fn test_gcloud_missing_binary() {
        let source = GcloudTokenSource::with_program("disco-test-no-such-gcloud");
        assert!(source.token().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_gcloud_failure_and_empty_output() {
        assert!(GcloudTokenSource::with_program("false").token().is_err());

        let err = GcloudTokenSource::with_program("true").token().unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[cfg(unix)]
    #[test]
    fn test_gcloud_output_is_trimmed() {
        // echo prints its arguments back, standing in for the token
        let token = GcloudTokenSource::with_program("echo").token().unwrap();
        assert_eq!(token, "auth print-access-token");
    }

    #[test]
    fn test_chain_returns_first_success() {
        let chain = ChainTokenSource::new(vec![
            Box::new(EnvTokenSource::new(vec!["DISCO_TEST_TOKEN_NEVER_SET".to_string()])),
            Box::new(StaticTokenSource::new("second")),
            Box::new(StaticTokenSource::new("third")),
        ]);
        assert_eq!(chain.token().unwrap(), "second");
    }

    #[test]
    fn test_chain_all_fail() {
        let chain = ChainTokenSource::new(vec![
            Box::new(EnvTokenSource::new(vec!["DISCO_TEST_TOKEN_NEVER_SET".to_string()])),
            Box::new(GcloudTokenSource::with_program("disco-test-no-such-gcloud")),
        ]);
        let err = chain.token().unwrap_err().to_string();
        assert!(err.contains("No access token available"));
        assert!(err.contains("environment"));
        assert!(err.contains("disco-test-no-such-gcloud"));
    }
}
