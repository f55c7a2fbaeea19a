#![allow(dead_code)]

pub mod temp_files {
    use std::path::PathBuf;

    use tempfile::TempDir;

    /// Writes a route file into a fresh temporary directory.
    ///
    /// The directory is removed when the returned `TempDir` is dropped.
    pub fn write_routes(content: &str, ext: &str) -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(format!("routes.{ext}"));
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }
}

pub mod fixtures {
    use piperoute::router::{Registration, Router};

    /// A small application table covering every template form.
    pub fn app_router() -> Router {
        Router::build(vec![
            Registration::new("GET", "/", "Page", "index").helper("root"),
            Registration::new("GET", "/pages/new", "Page", "new").helper("new_page"),
            Registration::new("GET", "/pages/:page", "Page", "show").helper("page"),
            Registration::new("GET", "/profiles/user-:id", "Profile", "show").helper("profile"),
            Registration::new("GET", "/files/*path", "File", "serve").helper("file"),
            Registration::new("GET", "/users/:id", "Api.User", "show")
                .host("api.")
                .helper("api_user"),
            Registration::new("GET", "/users/:id", "User", "show").helper("user"),
            Registration::new("*", "/health", "Health", "check"),
        ])
        .unwrap()
    }
}
