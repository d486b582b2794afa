use crate::surface::ControlFacts;

/// Classification of an interactive form control, resolved once per
/// field from a single snapshot read rather than re-inspected at each
/// use site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    TextInput,
    /// Radio button or checkbox.
    Choice,
    SingleSelect,
    MultiLineText,
    FileUpload,
    Unsupported,
}

/// Select values that mean "nothing chosen yet" rather than an answer.
const SELECT_PLACEHOLDERS: &[&str] = &["", "select", "select an option", "choose", "n/a"];

/// Determine a control's kind from its tag and type attribute.
pub fn classify(facts: &ControlFacts) -> ControlKind {
    match facts.tag.as_str() {
        "input" => match facts.input_type.as_str() {
            "checkbox" | "radio" => ControlKind::Choice,
            "file" => ControlKind::FileUpload,
            _ => ControlKind::TextInput,
        },
        "select" => ControlKind::SingleSelect,
        "textarea" => ControlKind::MultiLineText,
        _ => ControlKind::Unsupported,
    }
}

/// Whether a control already holds a usable value and needs no answer.
pub fn is_satisfied(kind: ControlKind, facts: &ControlFacts) -> bool {
    match kind {
        ControlKind::Choice => facts.checked,
        ControlKind::TextInput | ControlKind::MultiLineText => !facts.value.trim().is_empty(),
        ControlKind::SingleSelect => {
            let value = facts.value.trim().to_lowercase();
            !SELECT_PLACEHOLDERS.contains(&value.as_str())
        }
        // A pre-attached document counts as satisfied; an empty upload is
        // skipped elsewhere without being treated as a hard failure.
        ControlKind::FileUpload => !facts.value.trim().is_empty(),
        ControlKind::Unsupported => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(tag: &str, input_type: &str, value: &str, checked: bool) -> ControlFacts {
        ControlFacts {
            tag: tag.into(),
            input_type: input_type.into(),
            value: value.into(),
            checked,
        }
    }

    #[test]
    fn classifies_by_tag_and_type() {
        assert_eq!(classify(&facts("input", "text", "", false)), ControlKind::TextInput);
        assert_eq!(classify(&facts("input", "", "", false)), ControlKind::TextInput);
        assert_eq!(classify(&facts("input", "radio", "", false)), ControlKind::Choice);
        assert_eq!(classify(&facts("input", "checkbox", "", false)), ControlKind::Choice);
        assert_eq!(classify(&facts("input", "file", "", false)), ControlKind::FileUpload);
        assert_eq!(classify(&facts("select", "", "", false)), ControlKind::SingleSelect);
        assert_eq!(classify(&facts("textarea", "", "", false)), ControlKind::MultiLineText);
        assert_eq!(classify(&facts("div", "", "", false)), ControlKind::Unsupported);
    }

    #[test]
    fn choice_satisfied_only_when_checked() {
        let unchecked = facts("input", "radio", "", false);
        let checked = facts("input", "radio", "", true);
        assert!(!is_satisfied(ControlKind::Choice, &unchecked));
        assert!(is_satisfied(ControlKind::Choice, &checked));
    }

    #[test]
    fn select_placeholder_is_not_satisfied() {
        for placeholder in ["", "Select", "Select an option", "CHOOSE", "n/a", "  "] {
            let f = facts("select", "", placeholder, false);
            assert!(!is_satisfied(ControlKind::SingleSelect, &f), "{placeholder:?}");
        }
        let real = facts("select", "", "3-5 years", false);
        assert!(is_satisfied(ControlKind::SingleSelect, &real));
    }

    #[test]
    fn whitespace_only_text_is_not_satisfied() {
        let f = facts("input", "text", "   ", false);
        assert!(!is_satisfied(ControlKind::TextInput, &f));
    }
}
