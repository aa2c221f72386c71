//! JSON body guard that logs what mutating endpoints receive.

use rocket::data::{self, FromData};
use rocket::serde::json::Json;
use rocket::{Data, Request};
use serde::{Deserialize, Serialize};

/// Bodies longer than this are cut in the log line.
const MAX_LOGGED_BODY: usize = 2048;

/// Parses like `Json<T>` and logs the parsed body with the request line.
pub struct LoggedJson<T>(pub T);

impl<T> LoggedJson<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for LoggedJson<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

fn body_for_log<T: Serialize>(value: &T) -> String {
    match serde_json::to_string(value) {
        Ok(mut body) => {
            if body.len() > MAX_LOGGED_BODY {
                let mut cut = MAX_LOGGED_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
                body.push_str("...");
            }
            body
        }
        Err(_) => "<unserializable>".to_string(),
    }
}

#[rocket::async_trait]
impl<'r, T: Deserialize<'r> + Serialize> FromData<'r> for LoggedJson<T> {
    type Error = rocket::serde::json::Error<'r>;

    async fn from_data(req: &'r Request<'_>, data: Data<'r>) -> data::Outcome<'r, Self> {
        Json::<T>::from_data(req, data).await.map(|json| {
            let value = json.into_inner();
            info!("{} {} body: {}", req.method(), req.uri().path(), body_for_log(&value));
            LoggedJson(value)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_bodies_are_truncated() {
        let long = "x".repeat(MAX_LOGGED_BODY * 2);
        let logged = body_for_log(&long);
        assert!(logged.ends_with("..."));
        assert!(logged.len() <= MAX_LOGGED_BODY + 3);
        assert_eq!(body_for_log(&serde_json::json!({"a": 1})), r#"{"a":1}"#);
    }
}
