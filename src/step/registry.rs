// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`StepRegistry`] resolving step texts into definitions and arguments.

use tracing::{debug, Level};

use crate::{
    error::{NoMatchingStepError, RegistrationError, StepError},
    parameter::{Argument, ParameterRegistry, ParameterType},
};

use super::{pattern::Matcher, Implementation, Pattern, StepDefinition, StepMetadata};

/// [`StepDefinition`] selected for a step text, with the coerced arguments.
#[derive(Clone, Debug)]
pub struct Resolved<'r> {
    /// Winning definition.
    pub definition: &'r StepDefinition,

    /// Arguments in capture order.
    pub args: Vec<Argument>,
}

/// Registry of [`StepDefinition`]s.
///
/// Resolution is first-match-wins in registration order: later definitions
/// matching the same text are never selected. [`StepRegistry::shadowed()`]
/// lists them for auditing.
#[derive(Clone, Debug, Default)]
pub struct StepRegistry {
    definitions: Vec<StepDefinition>,
    parameters: ParameterRegistry,
}

impl StepRegistry {
    /// Creates a new empty [`StepRegistry`] with built-in parameter types.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new empty [`StepRegistry`] using the `parameters`.
    #[must_use]
    pub fn with_parameters(parameters: ParameterRegistry) -> Self {
        Self { definitions: Vec::new(), parameters }
    }

    /// [`ParameterRegistry`] used to compile patterns and coerce arguments.
    #[must_use]
    pub const fn parameters(&self) -> &ParameterRegistry {
        &self.parameters
    }

    /// Defines a custom parameter type usable by patterns registered
    /// afterwards.
    ///
    /// # Errors
    ///
    /// If the name collides with a built-in type.
    pub fn define_parameter_type(
        &mut self,
        ty: ParameterType,
    ) -> Result<(), RegistrationError> {
        self.parameters.define(ty)?;
        Ok(())
    }

    /// Registers a step.
    ///
    /// # Errors
    ///
    /// If the `pattern` is malformed or references an unknown parameter type.
    pub fn register(
        &mut self,
        pattern: impl Into<Pattern>,
        implementation: Implementation,
        metadata: StepMetadata,
    ) -> Result<&StepDefinition, RegistrationError> {
        let pattern = pattern.into();
        let matcher = Matcher::compile(&pattern, &self.parameters)?;
        debug!(
            %pattern,
            location = ?metadata.location,
            owner = ?implementation.owner(),
            "step registered",
        );
        self.definitions.push(StepDefinition::new(
            pattern,
            matcher,
            implementation,
            metadata,
        ));
        Ok(&self.definitions[self.definitions.len() - 1])
    }

    /// Resolves the `text` into the first matching definition and its
    /// coerced arguments.
    ///
    /// # Errors
    ///
    /// - [`StepError::NoMatch`] with a suggested expression if nothing
    ///   matches;
    /// - [`StepError::Transform`] if an argument can't be coerced.
    pub fn resolve(&self, text: &str) -> Result<Resolved<'_>, StepError> {
        let Some((idx, definition, captures)) =
            self.definitions.iter().enumerate().find_map(|(i, d)| {
                d.matcher().captures(text).map(|c| (i, d, c))
            })
        else {
            return Err(NoMatchingStepError {
                text: text.to_owned(),
                snippet: Some(self.parameters.snippet(text)),
            }
            .into());
        };

        if tracing::enabled!(Level::DEBUG) {
            for other in self.definitions[idx + 1..]
                .iter()
                .filter(|d| d.matcher().is_match(text))
            {
                debug!(
                    step = text,
                    selected = %definition.pattern(),
                    shadowed = %other.pattern(),
                    "step text matches more than one definition, the first \
                     registered one is used",
                );
            }
        }

        let args = captures
            .into_iter()
            .map(|(found, ty)| {
                let ty = ty.unwrap_or_else(|| self.parameters.detect_type(found));
                self.parameters.transform(found, ty)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Resolved { definition, args })
    }

    /// Every definition matching the `text` besides the one
    /// [`StepRegistry::resolve()`] selects.
    #[must_use]
    pub fn shadowed(&self, text: &str) -> Vec<&StepDefinition> {
        self.definitions
            .iter()
            .filter(|d| d.matcher().is_match(text))
            .skip(1)
            .collect()
    }

    /// Definitions in registration order.
    #[must_use]
    pub fn definitions(&self) -> &[StepDefinition] {
        &self.definitions
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use futures::{future::LocalBoxFuture, FutureExt as _};

    use super::*;
    use crate::{
        error::{TransformError, UnknownTypeError},
        location,
        step::StepCall,
    };

    fn noop(_: StepCall<'_>) -> LocalBoxFuture<'_, anyhow::Result<()>> {
        async { Ok(()) }.boxed_local()
    }

    fn registry(patterns: &[&str]) -> StepRegistry {
        let mut reg = StepRegistry::new();
        for p in patterns {
            _ = reg
                .register(*p, Implementation::free(noop), StepMetadata::new())
                .unwrap();
        }
        reg
    }

    fn pattern_of(r: &Resolved<'_>) -> String {
        r.definition.pattern().to_string()
    }

    #[test]
    fn extracts_typed_arguments() {
        let reg = registry(&["user enters {string} and {int}"]);

        let resolved = reg.resolve(r#"user enters "abc" and 42"#).unwrap();
        assert_eq!(resolved.args, [Argument::from("abc"), Argument::Int(42)]);
        assert_eq!(
            resolved.definition.parameter_types(),
            [Some("string"), Some("int")],
        );
    }

    #[test]
    fn first_registered_match_wins() {
        let reg = registry(&["I have {int} cukes", "I have {word} cukes", "I have 5 cukes"]);

        let resolved = reg.resolve("I have 5 cukes").unwrap();
        assert_eq!(pattern_of(&resolved), "I have {int} cukes");
        assert_eq!(
            reg.shadowed("I have 5 cukes")
                .iter()
                .map(|d| d.pattern().to_string())
                .collect::<Vec<_>>(),
            ["I have {word} cukes", "I have 5 cukes"],
        );

        let resolved = reg.resolve("I have many cukes").unwrap();
        assert_eq!(pattern_of(&resolved), "I have {word} cukes");
        assert!(reg.shadowed("I have many cukes").is_empty());
    }

    #[test]
    fn literal_patterns_match_exactly() {
        let mut reg = StepRegistry::new();
        _ = reg
            .register(
                Pattern::literal("I am on the (home) page"),
                Implementation::free(noop),
                StepMetadata::new(),
            )
            .unwrap();

        assert!(reg.resolve("I am on the (home) page").unwrap().args.is_empty());
        assert!(reg.resolve("I am on the home page").is_err());
    }

    #[test]
    fn regex_captures_are_auto_detected() {
        let mut reg = StepRegistry::new();
        _ = reg
            .register(
                Pattern::regex(r"^I wait (\S+) (\S+)( again)?$").unwrap(),
                Implementation::free(noop),
                StepMetadata::new(),
            )
            .unwrap();

        let resolved = reg.resolve("I wait 15 ms").unwrap();
        assert_eq!(
            resolved.args,
            [Argument::Int(15), Argument::from("ms"), Argument::from("")],
        );
        let resolved = reg.resolve(r#"I wait 2.5 "seconds" again"#).unwrap();
        assert_eq!(
            resolved.args,
            [Argument::Float(2.5), Argument::from("seconds"), Argument::from(" again")],
        );
    }

    #[test]
    fn no_match_suggests_a_snippet() {
        let reg = registry(&["I log in"]);

        let err = reg.resolve(r#"I buy 3 "apples""#).unwrap_err();
        assert_eq!(
            err,
            StepError::NoMatch(NoMatchingStepError {
                text: r#"I buy 3 "apples""#.into(),
                snippet: Some("I buy {int} {string}".into()),
            }),
        );
    }

    #[test]
    fn transform_failures_fail_resolution() {
        let mut reg = registry(&[]);
        reg.define_parameter_type(
            ParameterType::new("percent", r"\d+%", |s| {
                s.trim_end_matches('%')
                    .parse::<u8>()
                    .map_err(|e| e.to_string())
                    .and_then(|p| {
                        (p <= 100).then_some(p).ok_or_else(|| "over 100".to_owned())
                    })
                    .map(|p| Argument::Int(p.into()))
            })
            .unwrap(),
        )
        .unwrap();
        _ = reg
            .register(
                "discount is {percent}",
                Implementation::free(noop),
                StepMetadata::new(),
            )
            .unwrap();

        assert_eq!(reg.resolve("discount is 15%").unwrap().args, [Argument::Int(15)]);
        assert!(matches!(
            reg.resolve("discount is 150%"),
            Err(StepError::Transform(TransformError { ref type_name, .. }))
                if type_name == "percent",
        ));
    }

    #[test]
    fn unknown_types_fail_registration() {
        let mut reg = StepRegistry::new();
        let err = reg
            .register("I pick {color}", Implementation::free(noop), StepMetadata::new())
            .unwrap_err();

        assert_eq!(err, UnknownTypeError::new("color").into());
        assert!(reg.is_empty());
    }

    #[test]
    fn bound_definitions_remember_their_owner() {
        struct Cart(Vec<String>);

        let mut reg = StepRegistry::new();
        let def = reg
            .register(
                "I add {string} to the cart",
                Implementation::bound::<Cart, _>("cart", |cart, call| {
                    async move {
                        cart.0.push(call.arg(0)?);
                        anyhow::Ok(())
                    }
                    .boxed_local()
                }),
                StepMetadata::at(location!()).timeout(std::time::Duration::from_secs(1)),
            )
            .unwrap();

        assert_eq!(def.metadata().owner.as_deref(), Some("cart"));
        assert_eq!(def.implementation().owner(), Some("cart"));
        assert!(def.metadata().location.is_some());
    }
}
