//! Error types for the rulisp interpreter

use thiserror::Error;

/// rulisp interpreter errors
#[derive(Error, Debug, Clone)]
pub enum Error {
    // Reader errors
    /// Syntax error encountered while scanning or reading
    ///
    /// **Triggered by:** Unbalanced delimiters, bad escapes, stray characters
    /// **Example:** `(if (> x 10)` (missing closing parenthesis)
    #[error("Syntax error at line {line}, column {col}: {message}")]
    SyntaxError {
        /// Line number where error occurred
        line: usize,
        /// Column number where error occurred
        col: usize,
        /// Error description
        message: String,
    },

    /// General parse error
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Unexpected end of input while reading a form
    #[error("Unexpected end of input")]
    UnexpectedEof,

    /// Malformed arbitrary-precision literal
    ///
    /// **Triggered by:** A `N`-suffixed literal or `(bignum ...)` argument that is not a decimal
    /// **Example:** `(bignum "12x")`
    #[error("Invalid big number: {0}")]
    InvalidBigNumber(String),

    // Reference errors
    /// Reference to an unbound symbol
    ///
    /// **Triggered by:** Using a name that is neither a registered function nor bound in scope
    /// **Example:** `x` (when x was never defined)
    /// **Prevention:** Bind names with `(def x value)` or `let` before use
    #[error("Undefined symbol: {name}")]
    UndefinedSymbol {
        /// Symbol name
        name: String,
    },

    /// `module.member` access to a module that does not exist
    #[error("Undefined module: {name}")]
    UndefinedModule {
        /// Module name
        name: String,
    },

    /// `module.member` access to a member the module does not export
    #[error("Undefined symbol in module {module}: {name}")]
    UndefinedModuleSymbol {
        /// Module name
        module: String,
        /// Member name
        name: String,
    },

    /// Dotted symbol that does not split into exactly `module.member`
    #[error("Invalid module access: {name}")]
    InvalidModuleAccess {
        /// The offending symbol
        name: String,
    },

    // Call errors
    /// Wrong number of arguments
    ///
    /// **Triggered by:** Calling a function with too few or too many arguments
    /// **Example:** `((fn [x] x) 1 2)`
    #[error("Wrong number of arguments to {function}: expected {expected}, got {got}")]
    Arity {
        /// Function name
        function: String,
        /// Human readable expectation (`2`, `at least 1`, `0 or 1`)
        expected: String,
        /// Actual argument count
        got: usize,
    },

    /// Type mismatch error
    ///
    /// **Triggered by:** Operation expecting one kind of value but receiving another
    /// **Example:** `(+ "hello" 5)`, `(first 42)`
    #[error("Type error: expected {expected}, got {got}")]
    TypeError {
        /// Expected type
        expected: String,
        /// Actual type
        got: String,
    },

    /// Attempt to call a non-callable value
    #[error("Cannot call non-function: {type_name}")]
    NotCallable {
        /// Type of non-callable value
        type_name: String,
    },

    /// Evaluation of an empty list form
    #[error("Cannot evaluate empty list")]
    EmptyList,

    /// Division by zero error
    #[error("Division by zero")]
    DivisionByZero,

    /// Index out of bounds for a list, vector or string
    #[error("Index out of bounds: {index} for collection of length {length}")]
    IndexOutOfBounds {
        /// Requested index
        index: i64,
        /// Collection length
        length: usize,
    },

    /// Invalid arguments provided to a builtin
    #[error("Invalid arguments for {function}: {reason}")]
    InvalidArguments {
        /// Function name
        function: String,
        /// Reason for invalidity
        reason: String,
    },

    // Registry and plugin errors
    /// A function with this name is already registered
    #[error("Function already registered: {name}")]
    DuplicateFunction {
        /// Function name
        name: String,
    },

    /// Unregistering a function that is not registered
    #[error("Function not registered: {name}")]
    UnknownFunction {
        /// Function name
        name: String,
    },

    /// A plugin with this name is already loaded
    #[error("Plugin already loaded: {name}")]
    DuplicatePlugin {
        /// Plugin name
        name: String,
    },

    /// Plugin declared an empty name
    #[error("Plugin name cannot be empty")]
    InvalidPluginName,

    /// A declared dependency is not loaded
    #[error("Plugin {plugin} depends on {dependency}, which is not loaded")]
    MissingDependency {
        /// Plugin being loaded
        plugin: String,
        /// Dependency that is missing
        dependency: String,
    },

    /// Unload rejected because other loaded plugins depend on this one
    #[error("Plugin {plugin} is required by: {}", .dependents.join(", "))]
    PluginInUse {
        /// Plugin being unloaded
        plugin: String,
        /// Loaded plugins that depend on it
        dependents: Vec<String>,
    },

    /// Plugin is not loaded
    #[error("Plugin not loaded: {name}")]
    PluginNotLoaded {
        /// Plugin name
        name: String,
    },

    /// No builtin plugin has this name
    #[error("Unknown plugin: {name}")]
    UnknownPlugin {
        /// Requested name
        name: String,
    },

    // Concurrency errors
    /// Background evaluation failed unexpectedly
    ///
    /// **Triggered by:** A panic inside a `go` block; it is recovered and surfaced here
    #[error("Thread error: {message}")]
    ThreadError {
        /// Error message
        message: String,
    },

    /// Sending on a closed channel
    #[error("Send on closed channel")]
    ChannelClosed,

    // External errors
    /// File system failure
    #[error("IO error: {0}")]
    Io(String),

    /// JSON encoding or decoding failure
    #[error("JSON error: {0}")]
    Json(String),

    /// HTTP request failure
    #[error("HTTP error: {0}")]
    Http(String),

    // User-defined
    /// Error raised from user code with `throw`
    #[error("User error: {0}")]
    UserError(String),

    /// General runtime error
    #[error("Runtime error: {0}")]
    RuntimeError(String),

    // Decorations
    /// Error raised while executing a file
    #[error("{source} in file {path}")]
    InFile {
        /// Path of the file being executed
        path: String,
        /// Underlying error
        source: Box<Error>,
    },

    /// Error annotated with the call frames it propagated through
    #[error("{source}\n{}", format_frames(.frames))]
    Traced {
        /// Underlying error
        source: Box<Error>,
        /// Innermost frame first
        frames: Vec<CallFrame>,
    },
}

/// One entry of a call-stack trace attached to an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    /// Name of the called function (`<anonymous>` for unnamed closures)
    pub name: String,
    /// Rendered call form
    pub form: String,
}

fn format_frames(frames: &[CallFrame]) -> String {
    frames
        .iter()
        .map(|f| format!("  at {} {}", f.name, f.form))
        .collect::<Vec<_>>()
        .join("\n")
}

impl Error {
    /// Create a runtime error with a message
    pub fn runtime(msg: impl Into<String>) -> Self {
        Error::RuntimeError(msg.into())
    }

    /// Create an arity error
    pub fn arity(function: impl Into<String>, expected: impl Into<String>, got: usize) -> Self {
        Error::Arity {
            function: function.into(),
            expected: expected.into(),
            got,
        }
    }

    /// Create a type error
    pub fn type_error(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Error::TypeError {
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Create an invalid-arguments error
    pub fn invalid_args(function: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidArguments {
            function: function.into(),
            reason: reason.into(),
        }
    }

    /// Strip `InFile`/`Traced` decorations and return the underlying error
    pub fn root(&self) -> &Error {
        let mut current = self;
        loop {
            match current {
                Error::InFile { source, .. } | Error::Traced { source, .. } => current = source,
                other => return other,
            }
        }
    }

    /// Push a call frame onto this error, creating the trace if needed
    pub fn with_frame(self, frame: CallFrame) -> Self {
        match self {
            Error::Traced { source, mut frames } => {
                frames.push(frame);
                Error::Traced { source, frames }
            }
            other => Error::Traced {
                source: Box::new(other),
                frames: vec![frame],
            },
        }
    }

    /// Frames recorded on this error (empty when untraced)
    pub fn frames(&self) -> &[CallFrame] {
        match self {
            Error::Traced { frames, .. } => frames,
            Error::InFile { source, .. } => source.frames(),
            _ => &[],
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err.to_string())
    }
}

/// Result type for rulisp operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_peels_decorations() {
        let err = Error::InFile {
            path: "main.lisp".to_string(),
            source: Box::new(Error::DivisionByZero.with_frame(CallFrame {
                name: "f".to_string(),
                form: "(f 1)".to_string(),
            })),
        };
        assert!(matches!(err.root(), Error::DivisionByZero));
        assert_eq!(err.frames().len(), 1);
    }

    #[test]
    fn test_with_frame_appends() {
        let frame = |n: &str| CallFrame {
            name: n.to_string(),
            form: format!("({})", n),
        };
        let err = Error::runtime("boom").with_frame(frame("inner")).with_frame(frame("outer"));
        let names: Vec<_> = err.frames().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["inner", "outer"]);
        assert!(err.to_string().contains("at outer (outer)"));
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            Error::arity("f", "2", 3).to_string(),
            "Wrong number of arguments to f: expected 2, got 3"
        );
        assert_eq!(
            Error::PluginInUse {
                plugin: "core".to_string(),
                dependents: vec!["binding".to_string(), "module".to_string()],
            }
            .to_string(),
            "Plugin core is required by: binding, module"
        );
        let wrapped = Error::InFile {
            path: "x.lisp".to_string(),
            source: Box::new(Error::UndefinedSymbol {
                name: "y".to_string(),
            }),
        };
        assert_eq!(wrapped.to_string(), "Undefined symbol: y in file x.lisp");
    }
}
