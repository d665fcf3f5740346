//! Localized message tables.

use rpclib_core::{binary_object, Value};

binary_object! {
    /// Identifies one string table without its contents.
    pub struct Info("stringtable.Info") {
        pub package: String,
        pub culture_code: String,
        pub entry_count: u32,
    }
}

binary_object! {
    pub struct StringEntry("stringtable.Entry") {
        pub key: String,
        pub text: String,
    }
}

binary_object! {
    pub struct StringTable("stringtable.StringTable") {
        pub info: Info,
        pub entries: Vec<StringEntry>,
    }
}

binary_object! {
    /// A message reference plus the arguments to substitute into it.
    pub struct Msg("stringtable.Msg") {
        pub identifier: String,
        pub arguments: Vec<MsgArgument>,
    }
}

binary_object! {
    pub struct MsgArgument("stringtable.MsgArgument") {
        pub key: String,
        pub value: Value,
    }
}

impl StringTable {
    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.text.as_str())
    }

    /// Render `msg`, replacing each `{key}` with its argument.
    ///
    /// Unknown identifiers fall back to [`Msg`]'s own `Display`.
    pub fn format(&self, msg: &Msg) -> String {
        match self.lookup(&msg.identifier) {
            Some(template) => substitute(template, &msg.arguments),
            None => msg.to_string(),
        }
    }
}

impl Msg {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            arguments: Vec::new(),
        }
    }

    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.push(MsgArgument {
            key: key.into(),
            value: value.into(),
        });
        self
    }
}

impl std::fmt::Display for Msg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.identifier)?;
        if !self.arguments.is_empty() {
            let args: Vec<String> = self
                .arguments
                .iter()
                .map(|a| format!("{}={}", a.key, render(&a.value)))
                .collect();
            write!(f, "({})", args.join(", "))?;
        }
        Ok(())
    }
}

/// Replace each `{key}` in `template` with its argument, scanning left to
/// right so substituted text is never rescanned. Unknown keys stay as they
/// are.
fn substitute(template: &str, arguments: &[MsgArgument]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            rest = &rest[open..];
            break;
        };
        let key = &after[..close];
        match arguments.iter().find(|a| a.key == key) {
            Some(arg) => out.push_str(&render(&arg.value)),
            None => {
                out.push('{');
                out.push_str(key);
                out.push('}');
            }
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(v) => v.to_string(),
        Value::Int32(v) => v.to_string(),
        Value::Uint32(v) => v.to_string(),
        Value::Int64(v) => v.to_string(),
        Value::Uint64(v) => v.to_string(),
        Value::Float32(v) => v.to_string(),
        Value::Float64(v) => v.to_string(),
        Value::String(v) => v.clone(),
        Value::Bytes(v) => format!("<{} bytes>", v.len()),
        Value::Object(obj) => format!("{obj:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> StringTable {
        StringTable {
            info: Info {
                package: "service".into(),
                culture_code: "en-us".into(),
                entry_count: 1,
            },
            entries: vec![StringEntry {
                key: "ERR_NO_FRAME".into(),
                text: "Frame {index} is not available".into(),
            }],
        }
    }

    #[test]
    fn test_format_substitutes_arguments() {
        let msg = Msg::new("ERR_NO_FRAME").with_argument("index", 7u32);
        assert_eq!(table().format(&msg), "Frame 7 is not available");
    }

    #[test]
    fn test_substituted_text_is_not_rescanned() {
        let args = vec![
            MsgArgument {
                key: "a".into(),
                value: Value::String("{b}".into()),
            },
            MsgArgument {
                key: "b".into(),
                value: Value::String("B".into()),
            },
        ];
        assert_eq!(substitute("{a} then {b}", &args), "{b} then B");
        assert_eq!(substitute("{missing} {b", &args), "{missing} {b");
    }

    #[test]
    fn test_unknown_message_falls_back_to_identifier() {
        let msg = Msg::new("ERR_OTHER").with_argument("path", "a/b");
        assert_eq!(table().format(&msg), "ERR_OTHER(path=a/b)");
    }
}
