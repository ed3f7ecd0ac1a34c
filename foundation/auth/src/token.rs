pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Clone)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
    pub expiry: Option<time::OffsetDateTime>,
}

impl Token {
    pub fn value(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    pub fn valid(&self) -> bool {
        !self.access_token.is_empty() && !self.expired()
    }

    fn expired(&self) -> bool {
        match self.expiry {
            None => false,
            Some(s) => {
                let now = time::OffsetDateTime::now_utc();
                let exp = s + time::Duration::seconds(-10);
                now > exp
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_token_is_invalid() {
        let token = Token {
            access_token: "".to_string(),
            token_type: "Bearer".to_string(),
            expiry: None,
        };
        assert!(!token.valid());
    }

    #[test]
    fn test_token_without_expiry_is_valid() {
        let token = Token {
            access_token: "ya29.secret".to_string(),
            token_type: "Bearer".to_string(),
            expiry: None,
        };
        assert!(token.valid());
        assert_eq!("Bearer ya29.secret", token.value());
    }

    #[test]
    fn test_token_expiry_skew() {
        // 5 seconds of remaining lifetime falls inside the 10 second skew.
        let token = Token {
            access_token: "ya29.secret".to_string(),
            token_type: "Bearer".to_string(),
            expiry: Some(time::OffsetDateTime::now_utc() + time::Duration::seconds(5)),
        };
        assert!(!token.valid());

        let token = Token {
            access_token: "ya29.secret".to_string(),
            token_type: "Bearer".to_string(),
            expiry: Some(time::OffsetDateTime::now_utc() + time::Duration::seconds(60)),
        };
        assert!(token.valid());
    }
}
