use secrecy::SecretString;

#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub frontend_url: String,
    pub jwt_secret: SecretString,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(frontend_url: String) -> Self {
        Self {
            frontend_url,
            jwt_secret: SecretString::default(),
        }
    }

    pub fn set_secret(&mut self, secret: SecretString) {
        self.jwt_secret = secret;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_global_args() {
        let url = "http://127.0.0.1:5500".to_string();
        let args = GlobalArgs::new(url);
        assert_eq!(args.frontend_url, "http://127.0.0.1:5500");
        assert_eq!(args.jwt_secret.expose_secret(), "");
    }

    #[test]
    fn test_set_secret() {
        let mut args = GlobalArgs::new("http://127.0.0.1:5500".to_string());
        args.set_secret(SecretString::from("sekret"));
        assert_eq!(args.jwt_secret.expose_secret(), "sekret");
    }
}
