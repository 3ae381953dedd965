//! Preset highlighter for Python source.
//!
//! Tags are prefixed with `code.`, giving names such as `code.keyword` and
//! `code.str`. The first style that matches at a position wins, so reserved
//! keywords like `True` are tagged as keywords even though they are also
//! builtins.

use lazy_static::lazy_static;

use crate::highlighter::RegexHighlighter;

const PREFIX: &str = "code.";

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

const BUILTINS: &[&str] = &[
    // Constants
    "Ellipsis",
    "False",
    "None",
    "NotImplemented",
    "True",
    // Functions and types
    "abs",
    "aiter",
    "all",
    "anext",
    "any",
    "ascii",
    "bin",
    "bool",
    "breakpoint",
    "bytearray",
    "bytes",
    "callable",
    "chr",
    "classmethod",
    "compile",
    "complex",
    "copyright",
    "credits",
    "delattr",
    "dict",
    "dir",
    "divmod",
    "enumerate",
    "eval",
    "exec",
    "exit",
    "filter",
    "float",
    "format",
    "frozenset",
    "getattr",
    "globals",
    "hasattr",
    "hash",
    "help",
    "hex",
    "id",
    "input",
    "int",
    "isinstance",
    "issubclass",
    "iter",
    "len",
    "license",
    "list",
    "locals",
    "map",
    "max",
    "memoryview",
    "min",
    "next",
    "object",
    "oct",
    "open",
    "ord",
    "pow",
    "print",
    "property",
    "quit",
    "range",
    "repr",
    "reversed",
    "round",
    "set",
    "setattr",
    "slice",
    "sorted",
    "staticmethod",
    "str",
    "sum",
    "super",
    "tuple",
    "type",
    "vars",
    "zip",
    // Exceptions and warnings
    "ArithmeticError",
    "AssertionError",
    "AttributeError",
    "BaseException",
    "BaseExceptionGroup",
    "BlockingIOError",
    "BrokenPipeError",
    "BufferError",
    "BytesWarning",
    "ChildProcessError",
    "ConnectionAbortedError",
    "ConnectionError",
    "ConnectionRefusedError",
    "ConnectionResetError",
    "DeprecationWarning",
    "EOFError",
    "EncodingWarning",
    "EnvironmentError",
    "Exception",
    "ExceptionGroup",
    "FileExistsError",
    "FileNotFoundError",
    "FloatingPointError",
    "FutureWarning",
    "GeneratorExit",
    "IOError",
    "ImportError",
    "ImportWarning",
    "IndentationError",
    "IndexError",
    "InterruptedError",
    "IsADirectoryError",
    "KeyError",
    "KeyboardInterrupt",
    "LookupError",
    "MemoryError",
    "ModuleNotFoundError",
    "NameError",
    "NotADirectoryError",
    "NotImplementedError",
    "OSError",
    "OverflowError",
    "PendingDeprecationWarning",
    "PermissionError",
    "ProcessLookupError",
    "RecursionError",
    "ReferenceError",
    "ResourceWarning",
    "RuntimeError",
    "RuntimeWarning",
    "StopAsyncIteration",
    "StopIteration",
    "SyntaxError",
    "SyntaxWarning",
    "SystemError",
    "SystemExit",
    "TabError",
    "TimeoutError",
    "TypeError",
    "UnboundLocalError",
    "UnicodeDecodeError",
    "UnicodeEncodeError",
    "UnicodeError",
    "UnicodeTranslateError",
    "UnicodeWarning",
    "UserWarning",
    "ValueError",
    "Warning",
    "ZeroDivisionError",
];

lazy_static! {
    static ref PYTHON: RegexHighlighter =
        RegexHighlighter::new(python_styles(), PREFIX).expect("python styles are valid");
}

/// Styles used by [`highlight_python`], in precedence order.
///
/// Useful for building a variant with another prefix or extra styles.
pub fn python_styles() -> Vec<(String, String)> {
    vec![
        (
            "str".to_string(),
            r#"(?:\b[frbuFRBU]{1,2})?(?P<str_start>"""|'''|"|').*?(?P=str_start)"#.to_string(),
        ),
        ("comment".to_string(), "#.*".to_string()),
        ("keyword".to_string(), word_alternation(KEYWORDS)),
        (
            "builtin".to_string(),
            format!(r"(?<!\.){}", word_alternation(BUILTINS)),
        ),
        ("identifier".to_string(), r"[^\s.(]+(?=\()".to_string()),
        ("global".to_string(), r"\b[A-Z]\w+".to_string()),
        ("number".to_string(), r"0x[\da-fA-F]+|\d+".to_string()),
    ]
}

/// Shared Python highlighter, built on first use.
pub fn highlight_python() -> &'static RegexHighlighter {
    &PYTHON
}

fn word_alternation(words: &[&str]) -> String {
    format!(r"\b(?:{})\b", words.join("|"))
}
