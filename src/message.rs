//! Log messages and the caller annotation attached to severe ones.

use crate::level::Level;
use crate::value::Value;
use std::panic::Location;

/// Files longer than this are shortened to their trailing bytes.
const MAX_FILE_LEN: usize = 20;

/// One log record. Shared read-only between every sink that receives it.
#[derive(Debug, Clone)]
pub struct Message {
    pub level: Level,
    pub body: Vec<Value>,
}

impl Message {
    pub fn new(level: Level, body: Vec<Value>) -> Self {
        Self { level, body }
    }

    /// Append the caller annotation rendered for this message's level.
    pub fn annotate(&mut self, caller: &Caller) {
        let annotation = caller.annotation(self.level, &self.body);
        self.body.push(Value::Str(annotation));
    }
}

/// Source location of a log call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub file: &'static str,
    pub line: u32,
    /// Fully qualified enclosing function, when known.
    pub function: Option<&'static str>,
}

impl Caller {
    pub fn new(file: &'static str, line: u32, function: Option<&'static str>) -> Self {
        Self {
            file,
            line,
            function,
        }
    }

    /// Location of the outermost `#[track_caller]` frame.
    #[track_caller]
    pub fn here() -> Self {
        Self::from_location(Location::caller())
    }

    pub fn from_location(location: &'static Location<'static>) -> Self {
        Self::new(location.file(), location.line(), None)
    }

    /// `[TAG] [file:line func()] <body as text>`
    pub fn annotation(&self, level: Level, body: &[Value]) -> String {
        format!(
            "{}[{}:{} {}] {}",
            level.tag(),
            short_file(self.file),
            self.line,
            self.function_name(),
            sprint(body)
        )
    }

    fn function_name(&self) -> String {
        match self.function {
            Some(path) => {
                // async bodies report as `func::{{closure}}`
                let path = path.trim_end_matches("::{{closure}}");
                let name = path.rsplit("::").next().unwrap_or(path);
                format!("{}()", name)
            }
            None => "?()".to_string(),
        }
    }
}

fn short_file(file: &str) -> String {
    if file.len() <= MAX_FILE_LEN {
        return file.to_string();
    }
    let mut start = file.len() - MAX_FILE_LEN;
    while !file.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &file[start..])
}

/// Concatenate values, spacing two neighbours only when neither is a string.
pub fn sprint(values: &[Value]) -> String {
    let mut out = String::new();
    for (i, value) in values.iter().enumerate() {
        if i > 0 && !value.is_str() && !values[i - 1].is_str() {
            out.push(' ');
        }
        out.push_str(&value.to_string());
    }
    out
}

/// Expands to the fully qualified name of the enclosing function.
#[macro_export]
macro_rules! function_name {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        name.strip_suffix("::f").unwrap_or(name)
    }};
}

/// Expands to a [`Caller`] for the current source position.
#[macro_export]
macro_rules! caller {
    () => {
        $crate::message::Caller::new(file!(), line!(), Some($crate::function_name!()))
    };
}
