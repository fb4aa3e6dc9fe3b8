//! Error page template substitution
//!
//! The template recognises three angle-bracketed tokens: `<CAMNAME>`,
//! `<ERRORTEXT>` and `<APPURL>`. Substitution is a single left-to-right
//! pass. Replacement text is copied out verbatim and never rescanned, so a
//! device name that itself contains a token cannot expand further.

use tracing::debug;

/// Device name token
pub const CAM_NAME_TOKEN: &str = "<CAMNAME>";
/// Error message token
pub const ERROR_TEXT_TOKEN: &str = "<ERRORTEXT>";
/// Control application link token
pub const APP_URL_TOKEN: &str = "<APPURL>";

/// Built-in error page
pub const ERROR_TEMPLATE: &str = include_str!("../../assets/error.html");

/// Replace every occurrence of each `(token, value)` pair in one pass.
///
/// Tokens must start with `<`. Text matching no token is copied unchanged.
pub fn substitute(template: &str, substitutions: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match substitutions.iter().find(|(token, _)| tail.starts_with(token)) {
            Some((token, value)) => {
                out.push_str(value);
                rest = &tail[token.len()..];
            }
            None => {
                out.push('<');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Values for the error page
#[derive(Debug, Clone, Copy)]
pub struct ErrorPage<'a> {
    pub cam_name: &'a str,
    pub error_text: &'a str,
    pub app_url: Option<&'a str>,
}

impl ErrorPage<'_> {
    /// Fill the built-in template
    pub fn render(&self) -> String {
        self.render_template(ERROR_TEMPLATE)
    }

    /// Fill a custom template.
    ///
    /// Without an app URL the `<APPURL>` token is left as is.
    pub fn render_template(&self, template: &str) -> String {
        match self.app_url {
            Some(app_url) => substitute(
                template,
                &[
                    (CAM_NAME_TOKEN, self.cam_name),
                    (ERROR_TEXT_TOKEN, self.error_text),
                    (APP_URL_TOKEN, app_url),
                ],
            ),
            None => {
                debug!("No app_url configured, {} left unsubstituted", APP_URL_TOKEN);
                substitute(
                    template,
                    &[(CAM_NAME_TOKEN, self.cam_name), (ERROR_TEXT_TOKEN, self.error_text)],
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "<h1><CAMNAME></h1><p><ERRORTEXT></p><i><ERRORTEXT></i><a href=\"<APPURL>\">";

    #[test]
    fn replaces_every_occurrence() {
        let page = ErrorPage { cam_name: "Porch", error_text: "No camera", app_url: None };
        let html = page.render_template(TEMPLATE);
        assert_eq!(html.matches("No camera").count(), 2);
        assert!(html.starts_with("<h1>Porch</h1>"));
        assert!(!html.contains(ERROR_TEXT_TOKEN));
        assert!(!html.contains(CAM_NAME_TOKEN));
    }

    #[test]
    fn replacement_text_is_not_rescanned() {
        let page = ErrorPage {
            cam_name: "<ERRORTEXT><CAMNAME>",
            error_text: "boom",
            app_url: Some("http://cam.local/"),
        };
        let html = page.render_template("[<CAMNAME>] [<ERRORTEXT>]");
        assert_eq!(html, "[<ERRORTEXT><CAMNAME>] [boom]");
    }

    #[test]
    fn app_url_is_filled_when_configured() {
        let page = ErrorPage { cam_name: "c", error_text: "e", app_url: Some("http://10.0.0.2/") };
        let html = page.render_template(TEMPLATE);
        assert!(html.ends_with("<a href=\"http://10.0.0.2/\">"));
    }

    #[test]
    fn app_url_token_stays_when_unconfigured() {
        let page = ErrorPage { cam_name: "c", error_text: "e", app_url: None };
        assert!(page.render_template(TEMPLATE).contains(APP_URL_TOKEN));
    }

    #[test]
    fn unknown_tags_and_stray_brackets_pass_through() {
        let out = substitute("a < b <i>x</i> <CAMNAM <CAMNAME>", &[(CAM_NAME_TOKEN, "cam")]);
        assert_eq!(out, "a < b <i>x</i> <CAMNAM cam");
    }

    #[test]
    fn multibyte_text_around_tokens_survives() {
        let out = substitute("größe <CAMNAME> ✓", &[(CAM_NAME_TOKEN, "カメラ")]);
        assert_eq!(out, "größe カメラ ✓");
    }

    #[test]
    fn built_in_template_has_all_tokens() {
        assert!(ERROR_TEMPLATE.contains(CAM_NAME_TOKEN));
        assert!(ERROR_TEMPLATE.contains(ERROR_TEXT_TOKEN));
        assert!(ERROR_TEMPLATE.contains(APP_URL_TOKEN));

        let html =
            ErrorPage { cam_name: "Porch", error_text: "Sensor not found", app_url: Some("/") }.render();
        assert!(!html.contains(ERROR_TEXT_TOKEN));
        assert_eq!(html.matches("Sensor not found").count(), 2);
    }
}
