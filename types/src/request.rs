//! Input normalization: raw form text to a validated [`DiscoveryRequest`].

use thiserror::Error;

use crate::NonEmptyString;

/// Delimiter for the quantity list fields.
const LIST_DELIMITER: char = ',';

/// Raw form values, read at the moment the user triggers a discovery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormInput {
    pub output: String,
    pub inputs: String,
    pub constants: String,
    pub auto_search: bool,
}

/// Form field a [`ValidationError`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    Output,
    Inputs,
    Constants,
    AutoSearch,
}

impl FormField {
    pub const ALL: [Self; 4] = [Self::Output, Self::Inputs, Self::Constants, Self::AutoSearch];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Output => "Output quantity",
            Self::Inputs => "Input quantities",
            Self::Constants => "Constants to include",
            Self::AutoSearch => "Auto-search",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please provide an Output quantity.")]
    MissingOutput,
    #[error("Please provide at least one Input quantity.")]
    MissingInputs,
}

impl ValidationError {
    #[must_use]
    pub const fn field(self) -> FormField {
        match self {
            Self::MissingOutput => FormField::Output,
            Self::MissingInputs => FormField::Inputs,
        }
    }
}

/// Split a comma-delimited field, trimming each element and dropping empties.
///
/// Order is preserved and duplicates are kept.
#[must_use]
pub fn split_list(text: &str) -> Vec<String> {
    text.split(LIST_DELIMITER)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// One validated discovery request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryRequest {
    output: NonEmptyString,
    inputs: Vec<String>,
    constants: Vec<String>,
    auto_search: bool,
    verbose: bool,
}

impl DiscoveryRequest {
    /// Normalize raw form values.
    ///
    /// Only shape is checked here. Whether the named quantities exist is for
    /// the engine to decide.
    pub fn from_form(form: &FormInput, verbose: bool) -> Result<Self, ValidationError> {
        let output = NonEmptyString::new(form.output.trim())
            .map_err(|_| ValidationError::MissingOutput)?;
        let inputs = split_list(&form.inputs);
        if inputs.is_empty() {
            return Err(ValidationError::MissingInputs);
        }

        Ok(Self {
            output,
            inputs,
            constants: split_list(&form.constants),
            auto_search: form.auto_search,
            verbose,
        })
    }

    #[must_use]
    pub fn output(&self) -> &str {
        self.output.as_str()
    }

    #[must_use]
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    #[must_use]
    pub fn constants(&self) -> &[String] {
        &self.constants
    }

    #[must_use]
    pub fn auto_search(&self) -> bool {
        self.auto_search
    }

    #[must_use]
    pub fn verbose(&self) -> bool {
        self.verbose
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(output: &str, inputs: &str, constants: &str) -> FormInput {
        FormInput {
            output: output.to_string(),
            inputs: inputs.to_string(),
            constants: constants.to_string(),
            auto_search: false,
        }
    }

    #[test]
    fn split_list_trims_and_drops_empty_elements() {
        assert_eq!(split_list(" mass, , velocity "), vec!["mass", "velocity"]);
    }

    #[test]
    fn split_list_keeps_duplicates_in_order() {
        assert_eq!(split_list("time,mass,time"), vec!["time", "mass", "time"]);
    }

    #[test]
    fn split_list_of_blank_text_is_empty() {
        assert!(split_list("  ,  , ").is_empty());
        assert!(split_list("").is_empty());
    }

    #[test]
    fn empty_output_is_rejected() {
        let err = DiscoveryRequest::from_form(&form("   ", "mass", ""), true).unwrap_err();
        assert_eq!(err, ValidationError::MissingOutput);
        assert_eq!(err.field(), FormField::Output);
    }

    #[test]
    fn inputs_without_elements_are_rejected() {
        let err = DiscoveryRequest::from_form(&form("energy", " , ,", ""), true).unwrap_err();
        assert_eq!(err, ValidationError::MissingInputs);
        assert_eq!(err.field(), FormField::Inputs);
    }

    #[test]
    fn constants_may_be_empty() {
        let request =
            DiscoveryRequest::from_form(&form(" energy ", "mass, speed_of_light", ""), false)
                .expect("valid form");
        assert_eq!(request.output(), "energy");
        assert_eq!(request.inputs(), ["mass", "speed_of_light"]);
        assert!(request.constants().is_empty());
        assert!(!request.verbose());
    }

    #[test]
    fn flags_are_carried_through() {
        let mut raw = form("force", "mass, acceleration", "gravitational_constant");
        raw.auto_search = true;
        let request = DiscoveryRequest::from_form(&raw, true).expect("valid form");
        assert!(request.auto_search());
        assert!(request.verbose());
        assert_eq!(request.constants(), ["gravitational_constant"]);
    }
}
