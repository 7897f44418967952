use imgopt_core::{ObjectEvent, ProcessorConfig, SkipReason};

/// Result of the eligibility filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    Rejected(SkipReason),
}

impl Eligibility {
    pub fn is_eligible(self) -> bool {
        self == Eligibility::Eligible
    }
}

/// Decide whether an event should be processed at all.
///
/// Objects under the working directory are rejected first, then anything
/// whose declared content type is not an exact allow-list match.
pub fn is_eligible(event: &ObjectEvent, config: &ProcessorConfig) -> Eligibility {
    let working_segment = format!("/{}/", config.temp_dir);
    if event.id.contains(&working_segment) {
        return Eligibility::Rejected(SkipReason::TemporaryPath);
    }

    let supported = event
        .content_type
        .as_deref()
        .map(|content_type| {
            config
                .supported_content_types
                .iter()
                .any(|allowed| allowed == content_type)
        })
        .unwrap_or(false);

    if !supported {
        return Eligibility::Rejected(SkipReason::UnsupportedContentType);
    }

    Eligibility::Eligible
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(id: &str, content_type: Option<&str>) -> Eligibility {
        is_eligible(
            &ObjectEvent::new(id, "bucket", content_type),
            &ProcessorConfig::default(),
        )
    }

    #[test]
    fn test_supported_types_are_eligible() {
        for content_type in ["image/bmp", "image/jpeg", "image/tiff", "image/png"] {
            assert!(check("bucket/photos/a/1", Some(content_type)).is_eligible());
        }
    }

    #[test]
    fn test_working_directory_is_never_eligible() {
        for content_type in [Some("image/jpeg"), Some("text/plain"), None] {
            assert_eq!(
                check("bucket/tmp-sharp/photos/a.jpg/1612345678", content_type),
                Eligibility::Rejected(SkipReason::TemporaryPath)
            );
        }
    }

    #[test]
    fn test_working_directory_must_be_a_whole_segment() {
        assert!(check("bucket/not-tmp-sharp/a.jpg/1", Some("image/jpeg")).is_eligible());
        assert!(check("bucket/tmp-sharpened/a.jpg/1", Some("image/jpeg")).is_eligible());
    }

    #[test]
    fn test_content_type_match_is_exact() {
        for content_type in [
            Some("image/JPEG"),
            Some("image/jpg"),
            Some("image/webp"),
            Some("image/jpeg; charset=binary"),
            Some(""),
            None,
        ] {
            assert_eq!(
                check("bucket/a.jpg/1", content_type),
                Eligibility::Rejected(SkipReason::UnsupportedContentType),
                "{content_type:?}"
            );
        }
    }

    #[test]
    fn test_custom_allow_list() {
        let config = ProcessorConfig {
            supported_content_types: vec!["image/png".to_string()],
            temp_dir: "work".to_string(),
            ..ProcessorConfig::default()
        };

        let png = ObjectEvent::new("bucket/tmp-sharp/a.png/1", "bucket", Some("image/png"));
        assert!(is_eligible(&png, &config).is_eligible());

        let jpeg = ObjectEvent::new("bucket/a.jpg/1", "bucket", Some("image/jpeg"));
        assert!(!is_eligible(&jpeg, &config).is_eligible());

        let working = ObjectEvent::new("bucket/work/a.png/1", "bucket", Some("image/png"));
        assert_eq!(
            is_eligible(&working, &config),
            Eligibility::Rejected(SkipReason::TemporaryPath)
        );
    }
}
