//! 欄位樣板
//!
//! A field value is plain text with `{{ ... }}` actions. An action is a
//! pipeline of commands separated by `|`:
//!
//! ```text
//! {{ .first_file }}
//! {{ remap .file "/mnt/show" "S:" }}
//! {{ .first_file | dirname | abspath }}
//! {{ output "exrheader" (abspath .first_file) }}
//! ```
//!
//! Templates are compiled once at startup; helper names and argument counts
//! are checked at compile time.

use super::field_evaluator::FieldFuncs;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unclosed action starting at byte {0}")]
    UnclosedAction(usize),

    #[error("empty action")]
    EmptyAction,

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("unexpected {0:?} in action")]
    UnexpectedToken(String),

    #[error("unexpected end of action")]
    UnexpectedEnd,

    #[error("function {0:?} not defined")]
    UnknownFunction(String),

    #[error("wrong number of args for {name}: want {want}, got {got}")]
    WrongArity {
        name: String,
        want: String,
        got: usize,
    },

    #[error("{0:?} takes no arguments")]
    ValueWithArguments(String),
}

/// Number of arguments a helper accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    const fn accepts(self, count: usize) -> bool {
        match self {
            Self::Exact(n) => count == n,
            Self::AtLeast(n) => count >= n,
        }
    }

    fn describe(self) -> String {
        match self {
            Self::Exact(n) => n.to_string(),
            Self::AtLeast(n) => format!("at least {n}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Field(String),
    Literal(String),
    Nested(Pipeline),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Value(Operand),
    Call { name: String, args: Vec<Operand> },
}

/// 管線：前一個指令的結果會作為下一個指令的最後一個參數
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Action(Pipeline),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldTemplate {
    pub segments: Vec<Segment>,
}

impl FieldTemplate {
    pub fn compile(source: &str, funcs: &FieldFuncs) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(open) = rest.find("{{") {
            if open > 0 {
                segments.push(Segment::Text(rest[..open].to_string()));
            }
            let body_start = open + 2;
            let (tokens, close) = tokenize(&rest[body_start..], offset + open)?;
            if tokens.is_empty() {
                return Err(TemplateError::EmptyAction);
            }
            let mut parser = Parser {
                tokens,
                pos: 0,
                funcs,
            };
            let pipeline = parser.pipeline()?;
            if let Some(token) = parser.peek() {
                return Err(TemplateError::UnexpectedToken(token.describe()));
            }
            segments.push(Segment::Action(pipeline));

            let consumed = body_start + close + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self { segments })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Field(String),
    Ident(String),
    Str(String),
    Pipe,
    LParen,
    RParen,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Self::Field(name) => format!(".{name}"),
            Self::Ident(name) => name.clone(),
            Self::Str(value) => format!("{value:?}"),
            Self::Pipe => "|".to_string(),
            Self::LParen => "(".to_string(),
            Self::RParen => ")".to_string(),
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// 切出一個 action 的 token，回傳 token 與結尾 `}}` 在 `body` 中的位置
///
/// `}}` inside a string literal does not close the action.
fn tokenize(body: &str, open: usize) -> Result<(Vec<Token>, usize), TemplateError> {
    let mut tokens = Vec::new();
    let mut chars = body.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '}' => {
                if chars.next_if(|(_, next)| *next == '}').is_some() {
                    return Ok((tokens, start));
                }
                return Err(TemplateError::UnexpectedToken("}".to_string()));
            }
            '|' => tokens.push(Token::Pipe),
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            '"' => {
                let mut value = String::new();
                loop {
                    match chars.next() {
                        None => return Err(TemplateError::UnterminatedString),
                        Some((_, '"')) => break,
                        Some((_, '\\')) => match chars.next() {
                            Some((_, 'n')) => value.push('\n'),
                            Some((_, 't')) => value.push('\t'),
                            Some((_, other)) => value.push(other),
                            None => return Err(TemplateError::UnterminatedString),
                        },
                        Some((_, other)) => value.push(other),
                    }
                }
                tokens.push(Token::Str(value));
            }
            '`' => {
                let mut value = String::new();
                loop {
                    match chars.next() {
                        None => return Err(TemplateError::UnterminatedString),
                        Some((_, '`')) => break,
                        Some((_, other)) => value.push(other),
                    }
                }
                tokens.push(Token::Str(value));
            }
            '.' => {
                let mut name = String::new();
                while let Some((_, next)) = chars.next_if(|(_, next)| is_ident_char(*next)) {
                    name.push(next);
                }
                if name.is_empty() {
                    return Err(TemplateError::UnexpectedToken(".".to_string()));
                }
                tokens.push(Token::Field(name));
            }
            c if is_ident_char(c) => {
                let mut end = start + c.len_utf8();
                while let Some((i, next)) = chars.next_if(|(_, next)| is_ident_char(*next)) {
                    end = i + next.len_utf8();
                }
                tokens.push(Token::Ident(body[start..end].to_string()));
            }
            other => return Err(TemplateError::UnexpectedToken(other.to_string())),
        }
    }

    Err(TemplateError::UnclosedAction(open))
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    funcs: &'a FieldFuncs,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn pipeline(&mut self) -> Result<Pipeline, TemplateError> {
        let mut commands = vec![self.command(false)?];
        while self.peek() == Some(&Token::Pipe) {
            self.pos += 1;
            commands.push(self.command(true)?);
        }
        Ok(Pipeline { commands })
    }

    fn command(&mut self, piped: bool) -> Result<Command, TemplateError> {
        match self.peek() {
            Some(Token::Ident(_)) => {
                let Some(Token::Ident(name)) = self.next() else {
                    return Err(TemplateError::UnexpectedEnd);
                };
                let arity = self
                    .funcs
                    .arity(&name)
                    .ok_or_else(|| TemplateError::UnknownFunction(name.clone()))?;
                let args = self.operands()?;
                let got = args.len() + usize::from(piped);
                if !arity.accepts(got) {
                    return Err(TemplateError::WrongArity {
                        name,
                        want: arity.describe(),
                        got,
                    });
                }
                Ok(Command::Call { name, args })
            }
            Some(_) => {
                let operand = self.operand()?;
                if piped {
                    // Only a function can take the piped value.
                    return Err(TemplateError::ValueWithArguments(describe_operand(&operand)));
                }
                if let Some(token) = self.peek() {
                    if !matches!(token, Token::Pipe | Token::RParen) {
                        return Err(TemplateError::ValueWithArguments(describe_operand(&operand)));
                    }
                }
                Ok(Command::Value(operand))
            }
            None => Err(TemplateError::UnexpectedEnd),
        }
    }

    fn operands(&mut self) -> Result<Vec<Operand>, TemplateError> {
        let mut args = Vec::new();
        while let Some(token) = self.peek() {
            if matches!(token, Token::Pipe | Token::RParen) {
                break;
            }
            args.push(self.operand()?);
        }
        Ok(args)
    }

    fn operand(&mut self) -> Result<Operand, TemplateError> {
        match self.next() {
            Some(Token::Field(name)) => Ok(Operand::Field(name)),
            Some(Token::Str(value)) => Ok(Operand::Literal(value)),
            Some(Token::LParen) => {
                let pipeline = self.pipeline()?;
                match self.next() {
                    Some(Token::RParen) => Ok(Operand::Nested(pipeline)),
                    Some(token) => Err(TemplateError::UnexpectedToken(token.describe())),
                    None => Err(TemplateError::UnexpectedEnd),
                }
            }
            Some(token) => Err(TemplateError::UnexpectedToken(token.describe())),
            None => Err(TemplateError::UnexpectedEnd),
        }
    }
}

fn describe_operand(operand: &Operand) -> String {
    match operand {
        Operand::Field(name) => format!(".{name}"),
        Operand::Literal(value) => format!("{value:?}"),
        Operand::Nested(_) => "(...)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(source: &str) -> Result<FieldTemplate, TemplateError> {
        FieldTemplate::compile(source, &FieldFuncs::default())
    }

    #[test]
    fn test_plain_text() {
        let template = compile("no actions").unwrap();
        assert_eq!(template.segments, vec![Segment::Text("no actions".to_string())]);
        assert!(compile("").unwrap().segments.is_empty());
    }

    #[test]
    fn test_field_and_text() {
        let template = compile("{{ .start }}-{{.end}}").unwrap();
        assert_eq!(
            template.segments,
            vec![
                Segment::Action(Pipeline {
                    commands: vec![Command::Value(Operand::Field("start".to_string()))]
                }),
                Segment::Text("-".to_string()),
                Segment::Action(Pipeline {
                    commands: vec![Command::Value(Operand::Field("end".to_string()))]
                }),
            ]
        );
    }

    #[test]
    fn test_call_with_nested_and_pipe() {
        let template = compile(r#"{{ remap (dirname .file) `/a` "/b" | abspath }}"#).unwrap();
        let Segment::Action(pipeline) = &template.segments[0] else {
            panic!("expected action");
        };
        assert_eq!(pipeline.commands.len(), 2);
        let Command::Call { name, args } = &pipeline.commands[0] else {
            panic!("expected call");
        };
        assert_eq!(name, "remap");
        assert_eq!(args.len(), 3);
        assert!(matches!(&args[0], Operand::Nested(_)));
        assert_eq!(args[1], Operand::Literal("/a".to_string()));
        assert_eq!(args[2], Operand::Literal("/b".to_string()));
    }

    #[test]
    fn test_string_escapes() {
        let template = compile(r#"{{ "a\"b\\c\td" }}"#).unwrap();
        assert_eq!(
            template.segments,
            vec![Segment::Action(Pipeline {
                commands: vec![Command::Value(Operand::Literal("a\"b\\c\td".to_string()))]
            })]
        );
    }

    #[test]
    fn test_braces_inside_string_literals() {
        let template = compile(r#"{{ remap .file "}}" `{{x}}` }} tail"#).unwrap();
        let Segment::Action(pipeline) = &template.segments[0] else {
            panic!("expected action");
        };
        let Command::Call { args, .. } = &pipeline.commands[0] else {
            panic!("expected call");
        };
        assert_eq!(args[1], Operand::Literal("}}".to_string()));
        assert_eq!(args[2], Operand::Literal("{{x}}".to_string()));
        assert_eq!(template.segments[1], Segment::Text(" tail".to_string()));
    }

    #[test]
    fn test_compile_errors() {
        assert_eq!(compile("{{ .name "), Err(TemplateError::UnclosedAction(0)));
        assert_eq!(compile("x {{ }}"), Err(TemplateError::EmptyAction));
        assert_eq!(compile(r#"{{ "abc }}"#), Err(TemplateError::UnterminatedString));
        assert_eq!(
            compile("{{ upper .name }}"),
            Err(TemplateError::UnknownFunction("upper".to_string()))
        );
        assert_eq!(
            compile("{{ .name .file }}"),
            Err(TemplateError::ValueWithArguments(".name".to_string()))
        );
        assert_eq!(
            compile("{{ .name | .file }}"),
            Err(TemplateError::ValueWithArguments(".file".to_string()))
        );
        assert_eq!(compile("{{ (dirname .file }}"), Err(TemplateError::UnexpectedEnd));
        assert_eq!(compile("{{ . }}"), Err(TemplateError::UnexpectedToken(".".to_string())));
        assert_eq!(compile("{{ .a | }}"), Err(TemplateError::UnexpectedEnd));
        assert_eq!(compile("ab {{ .a } }}"), Err(TemplateError::UnexpectedToken("}".to_string())));
        assert_eq!(compile(r#"x {{ .a "}}""#), Err(TemplateError::UnclosedAction(2)));
    }

    #[test]
    fn test_arity_is_checked() {
        assert_eq!(
            compile("{{ dirname .a .b }}"),
            Err(TemplateError::WrongArity {
                name: "dirname".to_string(),
                want: "1".to_string(),
                got: 2,
            })
        );
        assert!(compile("{{ .a | remap \"x\" \"y\" }}").is_ok());
        assert!(matches!(
            compile("{{ output }}"),
            Err(TemplateError::WrongArity { .. })
        ));
        assert!(compile("{{ \"ffprobe\" | output }}").is_ok());
    }
}
