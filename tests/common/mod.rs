#![allow(dead_code)]

pub mod temp_files {
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Temporary file with the given extension; removed when dropped.
    pub fn create_temp_file(content: &str, ext: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .prefix("decoy_test_")
            .suffix(&format!(".{ext}"))
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    pub fn create_temp_yaml(content: &str) -> NamedTempFile {
        create_temp_file(content, "yaml")
    }

    pub fn create_temp_json(content: &str) -> NamedTempFile {
        create_temp_file(content, "json")
    }
}

pub mod requests {
    use decoy::MockRequest;
    use http::Method;

    pub fn get(path: &str) -> MockRequest {
        MockRequest::new(Method::GET, path)
    }

    pub fn post(path: &str) -> MockRequest {
        MockRequest::new(Method::POST, path)
    }
}
