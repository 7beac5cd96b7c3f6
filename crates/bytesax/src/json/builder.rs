//! Parser configuration: options, handler registration, build-time checks.

use super::error::{BoxError, BuildError};
use super::JsonParser;

/// What a handler returns: `Ok(true)` to continue, `Ok(false)` to cancel the
/// parse, `Err` to abort with the cause preserved in the surfaced error.
pub type HandlerResult = Result<bool, BoxError>;

pub(crate) type EventHandler = Box<dyn FnMut() -> HandlerResult>;
pub(crate) type TextHandler = Box<dyn FnMut(&str) -> HandlerResult>;
pub(crate) type BooleanHandler = Box<dyn FnMut(bool) -> HandlerResult>;
pub(crate) type IntegerHandler = Box<dyn FnMut(i64) -> HandlerResult>;
pub(crate) type FloatingHandler = Box<dyn FnMut(f64) -> HandlerResult>;

/// How the parser treats input after the first complete top-level value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TopLevelStrategy {
    /// Exactly one value; trailing whitespace is accepted, anything else is
    /// rejected as trailing garbage.
    #[default]
    SingleValue,
    /// Stop after one value and ignore whatever follows.
    AllowTrailingGarbage,
    /// Keep going: any number of whitespace-separated top-level values
    /// (JSON Lines and friends).
    AllowMultipleValues,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Options {
    pub(crate) allow_comments: bool,
    pub(crate) validate_strings: bool,
    pub(crate) allow_partial_values: bool,
    pub(crate) each_token_must_be_handled: bool,
    pub(crate) top_level: TopLevelStrategy,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            allow_comments: false,
            validate_strings: true,
            allow_partial_values: false,
            each_token_must_be_handled: true,
            top_level: TopLevelStrategy::default(),
        }
    }
}

#[derive(Default)]
pub(crate) struct Handlers {
    pub(crate) object_start: Option<EventHandler>,
    pub(crate) object_end: Option<EventHandler>,
    pub(crate) array_start: Option<EventHandler>,
    pub(crate) array_end: Option<EventHandler>,
    pub(crate) object_key: Option<TextHandler>,
    pub(crate) string: Option<TextHandler>,
    pub(crate) boolean: Option<BooleanHandler>,
    pub(crate) null: Option<EventHandler>,
    pub(crate) integer: Option<IntegerHandler>,
    pub(crate) floating: Option<FloatingHandler>,
    pub(crate) raw_number: Option<TextHandler>,
    pub(crate) reset_hook: Option<Box<dyn FnMut()>>,
}

impl Handlers {
    fn any_token_handler(&self) -> bool {
        // The reset hook intentionally does not count.
        self.object_start.is_some()
            || self.object_end.is_some()
            || self.array_start.is_some()
            || self.array_end.is_some()
            || self.object_key.is_some()
            || self.string.is_some()
            || self.boolean.is_some()
            || self.null.is_some()
            || self.integer.is_some()
            || self.floating.is_some()
            || self.raw_number.is_some()
    }
}

/// Configures and builds a [`JsonParser`].
///
/// Register the handlers you care about, pick options, and call
/// [`build`](Self::build). Handlers receive borrowed payloads valid only for
/// the duration of the call; they return [`HandlerResult`] to continue,
/// cancel, or fail the parse.
///
/// ```
/// use bytesax::JsonParser;
///
/// let mut depth = 0u32;
/// let mut parser = JsonParser::builder()
///     .each_token_must_be_handled(false)
///     .on_object_start(move || {
///         depth += 1;
///         Ok(depth < 64)
///     })
///     .build()
///     .unwrap();
/// assert!(parser.parse(br#"{"a": {}}"#).unwrap());
/// assert!(parser.finish().unwrap());
/// ```
#[derive(Default)]
pub struct JsonParserBuilder {
    options: Options,
    handlers: Handlers,
}

impl JsonParserBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow `//` and `/* */` comments between tokens. Off by default.
    #[must_use]
    pub fn allow_comments(mut self, allow: bool) -> Self {
        self.options.allow_comments = allow;
        self
    }

    /// Validate that string bytes form well-formed UTF-8 while scanning.
    /// On by default; turning it off skips the per-byte check for callers
    /// that trust their input.
    #[must_use]
    pub fn validate_strings(mut self, validate: bool) -> Self {
        self.options.validate_strings = validate;
        self
    }

    /// Make [`finish`](JsonParser::finish) succeed even when the input ends
    /// in the middle of a document. Off by default.
    #[must_use]
    pub fn allow_partial_values(mut self, allow: bool) -> Self {
        self.options.allow_partial_values = allow;
        self
    }

    /// When on (the default), a token arriving with no registered handler is
    /// a configuration error. When off such tokens are silently dropped,
    /// which lets a parser skip everything it does not care about.
    #[must_use]
    pub fn each_token_must_be_handled(mut self, strict: bool) -> Self {
        self.options.each_token_must_be_handled = strict;
        self
    }

    #[must_use]
    pub fn top_level_strategy(mut self, strategy: TopLevelStrategy) -> Self {
        self.options.top_level = strategy;
        self
    }

    #[must_use]
    pub fn on_object_start(mut self, h: impl FnMut() -> HandlerResult + 'static) -> Self {
        self.handlers.object_start = Some(Box::new(h));
        self
    }

    #[must_use]
    pub fn on_object_end(mut self, h: impl FnMut() -> HandlerResult + 'static) -> Self {
        self.handlers.object_end = Some(Box::new(h));
        self
    }

    #[must_use]
    pub fn on_array_start(mut self, h: impl FnMut() -> HandlerResult + 'static) -> Self {
        self.handlers.array_start = Some(Box::new(h));
        self
    }

    #[must_use]
    pub fn on_array_end(mut self, h: impl FnMut() -> HandlerResult + 'static) -> Self {
        self.handlers.array_end = Some(Box::new(h));
        self
    }

    /// Object keys, delivered decoded (escapes resolved) as a borrowed view.
    #[must_use]
    pub fn on_object_key(mut self, h: impl FnMut(&str) -> HandlerResult + 'static) -> Self {
        self.handlers.object_key = Some(Box::new(h));
        self
    }

    /// String values, delivered decoded as a borrowed view. When the source
    /// bytes contain no escapes the view borrows the input directly.
    #[must_use]
    pub fn on_string(mut self, h: impl FnMut(&str) -> HandlerResult + 'static) -> Self {
        self.handlers.string = Some(Box::new(h));
        self
    }

    #[must_use]
    pub fn on_boolean(mut self, h: impl FnMut(bool) -> HandlerResult + 'static) -> Self {
        self.handlers.boolean = Some(Box::new(h));
        self
    }

    #[must_use]
    pub fn on_null(mut self, h: impl FnMut() -> HandlerResult + 'static) -> Self {
        self.handlers.null = Some(Box::new(h));
        self
    }

    /// Typed integer values. Conflicts with [`on_raw_number`](Self::on_raw_number).
    #[must_use]
    pub fn on_integer(mut self, h: impl FnMut(i64) -> HandlerResult + 'static) -> Self {
        self.handlers.integer = Some(Box::new(h));
        self
    }

    /// Typed floating values. Conflicts with [`on_raw_number`](Self::on_raw_number).
    #[must_use]
    pub fn on_floating(mut self, h: impl FnMut(f64) -> HandlerResult + 'static) -> Self {
        self.handlers.floating = Some(Box::new(h));
        self
    }

    /// Numbers delivered as their original text, for callers that need exact
    /// textual fidelity or more range than `i64`/`f64`. Mutually exclusive
    /// with the typed number handlers.
    #[must_use]
    pub fn on_raw_number(mut self, h: impl FnMut(&str) -> HandlerResult + 'static) -> Self {
        self.handlers.raw_number = Some(Box::new(h));
        self
    }

    /// Invoked at the end of every [`reset`](JsonParser::reset) so adapters
    /// can clear their own state. Does not count as a token handler.
    #[must_use]
    pub fn on_reset(mut self, h: impl FnMut() + 'static) -> Self {
        self.handlers.reset_hook = Some(Box::new(h));
        self
    }

    /// Validates the handler set and builds the parser.
    pub fn build(self) -> Result<JsonParser, BuildError> {
        if self.handlers.raw_number.is_some() {
            if self.handlers.integer.is_some() {
                return Err(BuildError::NumberHandlerConflict("integer"));
            }
            if self.handlers.floating.is_some() {
                return Err(BuildError::NumberHandlerConflict("floating"));
            }
        }
        if !self.handlers.any_token_handler() {
            return Err(BuildError::NoTokenHandlers);
        }
        Ok(JsonParser::with_parts(self.options, self.handlers))
    }
}
