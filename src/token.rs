//! Extraction of the anti-forgery token from fetched form pages.

use scraper::{Html, Selector};


#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    /// The document contains no element with `name="token"`.
    #[error("no form field named \"token\" in document")]
    TokenNotFound,

    /// A token field exists but carries no `value` attribute, so there is no
    /// token to echo back. The HTML parser itself recovers from arbitrarily
    /// broken markup, so a structurally unusable field is the only way a
    /// document can be malformed for our purposes.
    #[error("form field named \"token\" has no value attribute")]
    MalformedDocument,
}

/// Finds the anti-forgery token in an HTML document: the `value` of the
/// first element carrying `name="token"` (for the services we target, a
/// hidden `<input>` inside the registration/login form).
///
/// Pure and stateless, safe to call from any number of workers at once.
pub fn extract_token(html: &str) -> Result<String, ExtractError> {
    // The selector is a constant, so compiling it can only fail if the
    // literal itself is broken.
    let token_field = Selector::parse(r#"[name="token"]"#)
        .expect("invalid token field selector");

    let document = Html::parse_document(html);
    let field = document.select(&token_field)
        .next()
        .ok_or(ExtractError::TokenNotFound)?;

    field.value()
        .attr("value")
        .map(str::to_owned)
        .ok_or(ExtractError::MalformedDocument)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_hidden_input_value() {
        let html = r#"
            <html><body>
              <form method="post" action="/register">
                <input type="text" name="email">
                <input type="hidden" name="token" value="T123">
              </form>
            </body></html>
        "#;
        assert_eq!(extract_token(html).unwrap(), "T123");
    }

    #[test]
    fn first_token_field_wins() {
        let html = r#"
            <input name="token" value="first">
            <input name="token" value="second">
        "#;
        assert_eq!(extract_token(html).unwrap(), "first");
    }

    #[test]
    fn missing_field_is_reported() {
        let html = "<html><body><form><input name=\"email\"></form></body></html>";
        assert_eq!(extract_token(html), Err(ExtractError::TokenNotFound));
    }

    #[test]
    fn field_without_value_is_malformed() {
        let html = "<input type=\"hidden\" name=\"token\">";
        assert_eq!(extract_token(html), Err(ExtractError::MalformedDocument));
    }

    #[test]
    fn survives_tag_soup() {
        // html5ever recovers from unclosed tags; the field must still be found.
        let html = "<p><div><input name=token value=tok-9><span>";
        assert_eq!(extract_token(html).unwrap(), "tok-9");
    }
}
