use crate::error::ShareError;
use crate::settings::PlaygroundSettings;
use crate::share::{decode_share_url, encode_share_url};
use crate::validation::validate_code;

use super::{render_report, CommandOutput, ExitStatus};

pub fn share(settings: &PlaygroundSettings, source: &str) -> CommandOutput {
    let report = validate_code(source, settings.validation_limits());
    if !report.valid {
        let mut out = CommandOutput::default();
        render_report(&report, &mut out);
        out.status = ExitStatus::Invalid;
        return out;
    }

    let mut out = CommandOutput::default();
    out.push_stdout(&encode_share_url(&settings.share_base_url, source));
    out
}

pub fn decode_link(link: &str) -> Result<String, ShareError> {
    decode_share_url(link)
}

pub fn render_open(decoded: Result<String, ShareError>) -> CommandOutput {
    let mut out = CommandOutput::default();
    match decoded {
        Ok(source) => out.push_stdout(&source),
        Err(e) => {
            out.push_stderr(&format!("❌ Could not load shared code: {}", e));
            out.status = ExitStatus::Invalid;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_then_open() {
        let settings = PlaygroundSettings::default();
        let shared = share(&settings, "print('hi')");
        assert!(shared.stdout.starts_with(&settings.share_base_url));

        let opened = render_open(decode_link(shared.stdout.trim()));
        assert_eq!(opened.stdout, "print('hi')\n");
        assert_eq!(opened.status, ExitStatus::Success);
    }

    #[test]
    fn test_empty_code_is_not_shared() {
        let out = share(&PlaygroundSettings::default(), "  ");
        assert_eq!(out.status, ExitStatus::Invalid);
        assert!(out.stdout.is_empty());
    }

    #[test]
    fn test_bad_link() {
        let out = render_open(decode_link("https://p.dev/?lang=py"));
        assert_eq!(out.status, ExitStatus::Invalid);
        assert!(out.stderr.contains("no `code` parameter"));
    }
}
