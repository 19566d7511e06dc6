//! Integration and security tests for the OAuth2 flow.

#[cfg(test)]
mod integration_tests {
    use crate::{
        AccessToken, AuthorizationRequest, CallbackOutcome, CallbackQuery, CallbackStage,
        ClientConfig, ClientOptions, Endpoint, InMemoryStateStore, OAuth2Client, OAuth2Config,
        OAuth2Error, OAuth2Flow, OAuth2Result, ProviderAdapter, ProviderEndpoints,
        ProviderSettings, ResourceOwner,
    };
    use async_trait::async_trait;
    use serde::Deserialize;
    use social_auth_core::{
        AuthenticateUserRequest, AuthenticatedSession, IdentityResult, UserAuthenticator,
    };
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex};
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Clone, Deserialize)]
    struct TestProfile {
        id: u64,
        name: String,
        avatar: Option<String>,
        url: Option<String>,
    }

    impl ResourceOwner for TestProfile {
        fn id(&self) -> String {
            self.id.to_string()
        }

        fn name(&self) -> &str {
            &self.name
        }

        fn avatar_url(&self) -> Option<&str> {
            self.avatar.as_deref()
        }

        fn profile_url(&self) -> Option<&str> {
            self.url.as_deref()
        }
    }

    struct TestSettings {
        client_id: String,
        client_secret: String,
        scopes: Vec<String>,
        endpoints: Vec<Endpoint>,
    }

    impl ProviderSettings for TestSettings {
        fn client_id(&self) -> &str {
            &self.client_id
        }

        fn client_secret(&self) -> &str {
            &self.client_secret
        }

        fn scopes(&self) -> Vec<String> {
            self.scopes.clone()
        }

        fn endpoints(&self) -> Vec<Endpoint> {
            self.endpoints.clone()
        }
    }

    struct TestProvider {
        endpoints: ProviderEndpoints,
    }

    #[async_trait]
    impl ProviderAdapter for TestProvider {
        type Settings = TestSettings;
        type Profile = TestProfile;

        fn plugin_id(&self) -> &'static str {
            "social_auth_test"
        }

        fn provider_name(&self) -> &'static str {
            "Test"
        }

        fn initialize(
            &self,
            settings: &TestSettings,
            options: &ClientOptions,
            http_timeout_seconds: u64,
        ) -> OAuth2Result<OAuth2Client> {
            OAuth2Client::new(
                ClientConfig {
                    client_id: settings.client_id.clone(),
                    client_secret: settings.client_secret.clone(),
                    redirect_uri: options.redirect_uri.clone(),
                    proxy: options.proxy.clone(),
                    http_timeout_seconds,
                    auth_params: HashMap::new(),
                },
                self.endpoints.clone(),
            )
        }

        fn build_authorization_url(
            &self,
            client: &OAuth2Client,
            extra_scopes: &[String],
        ) -> OAuth2Result<AuthorizationRequest> {
            client.authorization_url(extra_scopes)
        }

        async fn fetch_profile(
            &self,
            client: &OAuth2Client,
            token: &AccessToken,
        ) -> OAuth2Result<TestProfile> {
            let value = client.get_resource_owner(token).await?;
            serde_json::from_value(value)
                .map_err(|e| OAuth2Error::InvalidResourceOwner(e.to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingAuthenticator {
        linked: Mutex<HashSet<String>>,
        requests: Mutex<Vec<AuthenticateUserRequest>>,
    }

    impl RecordingAuthenticator {
        fn link(&self, provider_user_id: &str) {
            self.linked
                .lock()
                .unwrap()
                .insert(provider_user_id.to_string());
        }

        fn requests(&self) -> Vec<AuthenticateUserRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UserAuthenticator for RecordingAuthenticator {
        async fn check_provider_is_associated(
            &self,
            _plugin_id: &str,
            provider_user_id: &str,
        ) -> IdentityResult<bool> {
            Ok(self.linked.lock().unwrap().contains(provider_user_id))
        }

        async fn authenticate_user(
            &self,
            request: AuthenticateUserRequest,
        ) -> IdentityResult<AuthenticatedSession> {
            let new_account = self
                .linked
                .lock()
                .unwrap()
                .insert(request.provider_user_id.clone());
            let user_id = format!("user-{}", request.provider_user_id);
            self.requests.lock().unwrap().push(request);

            Ok(AuthenticatedSession {
                user_id,
                session_token: "session-token".to_string(),
                new_account,
            })
        }
    }

    fn endpoints_for(server: &MockServer) -> ProviderEndpoints {
        ProviderEndpoints {
            authorization_endpoint: format!("{}/oauth/authorize", server.uri()),
            token_endpoint: format!("{}/oauth/token", server.uri()),
            resource_owner_endpoint: format!("{}/user", server.uri()),
            api_base_url: server.uri(),
            scope_separator: " ".to_string(),
        }
    }

    fn test_settings(endpoints: Vec<Endpoint>) -> TestSettings {
        TestSettings {
            client_id: "mock_client_id".to_string(),
            client_secret: "mock_secret".to_string(),
            scopes: vec!["public".to_string()],
            endpoints,
        }
    }

    fn create_flow(
        server: &MockServer,
        settings: &TestSettings,
        store: Arc<InMemoryStateStore>,
    ) -> OAuth2Flow<TestProvider> {
        OAuth2Flow::new(
            TestProvider {
                endpoints: endpoints_for(server),
            },
            settings,
            ClientOptions {
                redirect_uri: "http://localhost:3000/callback".to_string(),
                proxy: None,
            },
            store,
            &OAuth2Config::default(),
        )
        .unwrap()
    }

    async fn mount_token_endpoint(server: &MockServer, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=mock_auth_code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "mock_access_token",
                "token_type": "bearer",
                "scope": "public"
            })))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    async fn mount_user_endpoint(server: &MockServer, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path("/user"))
            .and(header("Authorization", "Bearer mock_access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 42,
                "name": "Jane",
                "avatar": "https://x/a.png",
                "url": "https://x/jane"
            })))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    fn success_query(state: &str) -> CallbackQuery {
        CallbackQuery {
            code: Some("mock_auth_code".to_string()),
            state: Some(state.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_full_oauth2_flow() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server, 1).await;
        mount_user_endpoint(&server, 1).await;
        Mock::given(method("GET"))
            .and(path("/user/likes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{"id": 1}])))
            .expect(1)
            .mount(&server)
            .await;

        let settings = test_settings(vec![Endpoint {
            path: "/user/likes".to_string(),
            name: "likes".to_string(),
        }]);
        let store = Arc::new(InMemoryStateStore::new());
        let flow = create_flow(&server, &settings, store.clone());
        let authenticator = RecordingAuthenticator::default();

        let request = flow.start("session-1").await.unwrap();
        assert!(request.url.contains("/oauth/authorize"));
        assert!(request.url.contains("response_type=code"));

        let outcome = flow
            .handle_callback(Some("session-1"), success_query(&request.state), &authenticator)
            .await;

        match outcome {
            CallbackOutcome::Authenticated(session) => {
                assert_eq!(session.user_id, "user-42");
                assert!(session.new_account);
            }
            other => panic!("Expected authenticated outcome, got {:?}", other),
        }

        let requests = authenticator.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].plugin_id, "social_auth_test");
        assert_eq!(requests[0].display_name, "Jane");
        assert_eq!(requests[0].provider_user_id, "42");
        assert_eq!(requests[0].access_token, "mock_access_token");
        assert_eq!(requests[0].avatar_url.as_deref(), Some("https://x/a.png"));
        assert_eq!(requests[0].profile_url.as_deref(), Some("https://x/jane"));
        assert_eq!(
            requests[0].extra_data,
            Some(serde_json::json!({"likes": [{"id": 1}]}))
        );

        // The state was consumed
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_linked_account_skips_extra_details() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server, 1).await;
        mount_user_endpoint(&server, 1).await;
        Mock::given(method("GET"))
            .and(path("/user/likes"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let settings = test_settings(vec![Endpoint {
            path: "/user/likes".to_string(),
            name: "likes".to_string(),
        }]);
        let flow = create_flow(&server, &settings, Arc::new(InMemoryStateStore::new()));
        let authenticator = RecordingAuthenticator::default();
        authenticator.link("42");

        let request = flow.start("session-1").await.unwrap();
        let outcome = flow
            .handle_callback(Some("session-1"), success_query(&request.state), &authenticator)
            .await;

        assert!(matches!(outcome, CallbackOutcome::Authenticated(ref s) if !s.new_account));
        assert_eq!(authenticator.requests()[0].extra_data, None);
    }

    #[tokio::test]
    async fn test_provider_error_never_exchanges_code() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server, 0).await;

        let settings = test_settings(vec![]);
        let store = Arc::new(InMemoryStateStore::new());
        let flow = create_flow(&server, &settings, store.clone());
        let authenticator = RecordingAuthenticator::default();

        flow.start("session-1").await.unwrap();
        let query = CallbackQuery {
            error: Some("access_denied".to_string()),
            error_description: Some("The user denied access".to_string()),
            ..Default::default()
        };

        let outcome = flow
            .handle_callback(Some("session-1"), query, &authenticator)
            .await;

        match outcome {
            CallbackOutcome::Failed(failure) => {
                assert_eq!(failure.stage, CallbackStage::AwaitingRedirect);
                assert_eq!(failure.message, crate::AUTHENTICATION_DENIED_MESSAGE);
            }
            other => panic!("Expected failure, got {:?}", other),
        }
        assert!(authenticator.requests().is_empty());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_state_mismatch_rejected_before_exchange() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server, 0).await;

        let settings = test_settings(vec![]);
        let flow = create_flow(&server, &settings, Arc::new(InMemoryStateStore::new()));
        let authenticator = RecordingAuthenticator::default();

        flow.start("session-1").await.unwrap();
        let outcome = flow
            .handle_callback(Some("session-1"), success_query("forged"), &authenticator)
            .await;
        assert!(matches!(
            outcome,
            CallbackOutcome::Failed(ref f) if f.stage == CallbackStage::ValidatingState
        ));

        // A state issued to another session is not accepted either
        let request = flow.start("session-2").await.unwrap();
        let outcome = flow
            .handle_callback(Some("session-3"), success_query(&request.state), &authenticator)
            .await;
        assert!(matches!(
            outcome,
            CallbackOutcome::Failed(ref f) if f.stage == CallbackStage::ValidatingState
        ));

        let outcome = flow
            .handle_callback(None, success_query(&request.state), &authenticator)
            .await;
        assert!(matches!(
            outcome,
            CallbackOutcome::Failed(ref f) if f.message == crate::INVALID_STATE_MESSAGE
        ));
    }

    #[tokio::test]
    async fn test_token_exchange_error_cases() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "The provided authorization grant is invalid"
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .named("malformed_response")
            .mount(&server)
            .await;

        mount_user_endpoint(&server, 0).await;

        let settings = test_settings(vec![]);
        let flow = create_flow(&server, &settings, Arc::new(InMemoryStateStore::new()));

        let result = flow.authenticate("invalid_code").await;
        match result {
            Err(OAuth2Error::IdentityProviderError(message)) => {
                assert_eq!(message, "The provided authorization grant is invalid");
            }
            Err(other) => panic!("Expected identity provider error, got {}", other),
            Ok(_) => panic!("Expected identity provider error"),
        }

        let result = flow.authenticate("mock_auth_code").await;
        assert!(matches!(result, Err(OAuth2Error::InvalidTokenResponse(_))));

        let authenticator = RecordingAuthenticator::default();
        let request = flow.start("session-1").await.unwrap();
        let outcome = flow
            .handle_callback(Some("session-1"), success_query(&request.state), &authenticator)
            .await;
        assert!(matches!(
            outcome,
            CallbackOutcome::Failed(ref f) if f.stage == CallbackStage::ExchangingToken
        ));
        assert!(authenticator.requests().is_empty());
    }

    #[tokio::test]
    async fn test_profile_is_fetched_once_per_attempt() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server, 1).await;
        mount_user_endpoint(&server, 1).await;

        let settings = test_settings(vec![]);
        let flow = create_flow(&server, &settings, Arc::new(InMemoryStateStore::new()));

        let mut attempt = flow.authenticate("mock_auth_code").await.unwrap();
        assert_eq!(attempt.access_token().secret(), "mock_access_token");

        let first = attempt.user_info().await.unwrap().id();
        let second = attempt.user_info().await.unwrap().id();
        assert_eq!(first, "42");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_failed_endpoint_degrades_to_no_data() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server, 1).await;
        Mock::given(method("GET"))
            .and(path("/user/followers"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "message": "Internal error"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/other/thing"))
            .respond_with(ResponseTemplate::new(200).set_body_string("plain text"))
            .mount(&server)
            .await;

        let settings = test_settings(vec![
            Endpoint {
                path: "/user/followers".to_string(),
                name: "followers".to_string(),
            },
            Endpoint {
                path: "/other/thing".to_string(),
                name: "thing".to_string(),
            },
        ]);
        let flow = create_flow(&server, &settings, Arc::new(InMemoryStateStore::new()));
        let attempt = flow.authenticate("mock_auth_code").await.unwrap();

        assert!(
            attempt
                .request_endpoint(crate::Method::GET, "/user/followers", None)
                .await
                .is_none()
        );

        let details = attempt.extra_details().await.unwrap();
        assert_eq!(
            details,
            serde_json::json!({"followers": null, "thing": "plain text"})
        );

        let custom_domain = attempt
            .request_endpoint(crate::Method::GET, "/thing", Some(&format!("{}/other", server.uri())))
            .await;
        assert_eq!(custom_domain, Some(serde_json::json!("plain text")));
    }

    #[tokio::test]
    async fn test_concurrent_state_handling() {
        use tokio::task;

        let server = MockServer::start().await;
        let settings = test_settings(vec![]);
        let store = Arc::new(InMemoryStateStore::new());
        let flow = Arc::new(create_flow(&server, &settings, store.clone()));

        let mut handles = vec![];
        for i in 0..10 {
            let flow = flow.clone();
            handles.push(task::spawn(async move {
                flow.start(&format!("session-{}", i)).await
            }));
        }

        let mut states = vec![];
        for handle in handles {
            states.push(handle.await.unwrap().unwrap().state);
        }

        let unique_states: HashSet<_> = states.iter().collect();
        assert_eq!(unique_states.len(), states.len());
        assert_eq!(store.len().await, 10);
    }
}
