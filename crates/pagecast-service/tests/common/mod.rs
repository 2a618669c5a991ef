#![allow(dead_code)]

pub mod server_utils {
    use axum_test::TestServer;
    use pagecast_service::create_app;
    use pagecast_service::test_helpers::{TestAppState, test_state};

    /// Test server over in-memory collaborators. The returned state shares
    /// them, so tests can seed pages and inspect what was stored or published.
    pub fn create_test_server() -> (TestServer, TestAppState) {
        let state = test_state();
        let server = TestServer::new(create_app(state.clone())).unwrap();
        (server, state)
    }
}

pub mod fixtures {
    use pagecast_service::AppState;
    use pagecast_service::models::Page;
    use pagecast_service::test_helpers::TestAppState;

    pub struct Pages {
        pub downtown: Page,
        pub harbor: Page,
        pub airport: Page,
    }

    pub fn seed_pages(state: &TestAppState) -> Pages {
        let store = state.store();
        Pages {
            downtown: store.add_page("Downtown", Some("1234"), "fb-downtown"),
            harbor: store.add_page("Harbor", Some("5678"), "fb-harbor"),
            airport: store.add_page("Airport", None, "fb-airport"),
        }
    }
}
