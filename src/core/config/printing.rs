use crate::core::config::data::Config;

fn mask_key(key: &str) -> String {
    let count = key.chars().count();
    if count <= 8 {
        return "****".to_string();
    }
    let tail: String = key.chars().skip(count - 4).collect();
    format!("****{tail}")
}

impl Config {
    pub fn print_all(&self) {
        println!("Current configuration:");
        match &self.endpoint {
            Some(endpoint) => println!("  endpoint: {endpoint}"),
            None => println!("  endpoint: (unset)"),
        }
        match &self.api_key {
            Some(key) => println!("  api-key: {}", mask_key(key)),
            None => println!("  api-key: (unset)"),
        }
        match &self.language {
            Some(language) => println!("  language: {language}"),
            None => println!("  language: (auto)"),
        }
        match &self.theme {
            Some(theme) => println!("  theme: {theme}"),
            None => println!("  theme: (unset)"),
        }
    }
}
