//! 欄位運算
//!
//! Compiles every configured field once and evaluates it against a single
//! sequence or movie.

use super::field_template::{Arity, Command, FieldTemplate, Operand, Pipeline, Segment};
use super::mov_builder::Mov;
use super::sequence_grouper::Sequence;
use crate::config::{Config, DEFAULT_ALLOWED_COMMANDS, Field};
use crate::tools::clean_path;
use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::process::Command as Process;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("can't evaluate field {field} in {entity}")]
    UnknownField { field: String, entity: &'static str },

    #[error("no {kind} field named {field:?}")]
    UndefinedField { field: String, kind: &'static str },

    #[error("frame range of {0} is too long to count")]
    FrameRangeTooLong(String),

    #[error("unsafe command: {0}")]
    UnsafeCommand(String),

    #[error("failed to execute: {0}")]
    CommandFailed(String),

    #[error("{name}: {reason}")]
    Helper { name: &'static str, reason: String },
}

/// 一筆報表資料：序列或影片
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    Sequence(Sequence),
    Movie(Mov),
}

impl Entity {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Sequence(_) => "sequence",
            Self::Movie(_) => "movie",
        }
    }

    /// 讀取樣板中 `.name` 對應的值
    pub fn lookup(&self, name: &str) -> Result<String, EvalError> {
        let value = match self {
            Self::Sequence(seq) => match name {
                "name" => Some(seq.name.clone()),
                "start" => Some(seq.start.literal.clone()),
                "end" => Some(seq.end.literal.clone()),
                "first_file" => Some(seq.first_file()),
                "last_file" => Some(seq.last_file()),
                "length" => {
                    let length = seq
                        .length()
                        .ok_or_else(|| EvalError::FrameRangeTooLong(seq.name.clone()))?;
                    Some(length.to_string())
                }
                _ => None,
            },
            Self::Movie(mov) => match name {
                "file" => Some(mov.file.clone()),
                "timecode_in" => Some(mov.timecode_in.clone()),
                "timecode_out" => Some(mov.timecode_out.clone()),
                "duration" => Some(mov.duration.clone()),
                "fps" => Some(mov.fps.clone()),
                "resolution" => Some(mov.resolution.clone()),
                "codec" => Some(mov.codec.clone()),
                "colorspace" => Some(mov.colorspace.clone()),
                _ => None,
            },
        };
        value.ok_or_else(|| EvalError::UnknownField {
            field: name.to_string(),
            entity: self.kind(),
        })
    }
}

type Helper = fn(&FieldFuncs, &[String]) -> Result<String, EvalError>;

/// 樣板可呼叫的函式表
///
/// Immutable once built; `output` may only run commands on the allow-list.
#[derive(Clone)]
pub struct FieldFuncs {
    helpers: HashMap<&'static str, (Arity, Helper)>,
    allowed_commands: HashSet<String>,
}

impl Default for FieldFuncs {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_COMMANDS.iter().copied())
    }
}

impl std::fmt::Debug for FieldFuncs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut helpers: Vec<_> = self.helpers.keys().collect();
        helpers.sort();
        f.debug_struct("FieldFuncs")
            .field("helpers", &helpers)
            .field("allowed_commands", &self.allowed_commands)
            .finish()
    }
}

impl FieldFuncs {
    pub fn new<S: Into<String>>(allowed_commands: impl IntoIterator<Item = S>) -> Self {
        let mut helpers: HashMap<&'static str, (Arity, Helper)> = HashMap::new();
        helpers.insert("remap", (Arity::Exact(3), remap as Helper));
        helpers.insert("dirname", (Arity::Exact(1), dirname as Helper));
        helpers.insert("abspath", (Arity::Exact(1), abspath as Helper));
        helpers.insert("output", (Arity::AtLeast(1), output as Helper));

        Self {
            helpers,
            allowed_commands: allowed_commands.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn arity(&self, name: &str) -> Option<Arity> {
        self.helpers.get(name).map(|(arity, _)| *arity)
    }

    #[must_use]
    pub fn is_allowed(&self, command: &str) -> bool {
        self.allowed_commands.contains(command)
    }

    pub fn call(&self, name: &str, args: &[String]) -> Result<String, EvalError> {
        let (_, helper) = self.helpers.get(name).ok_or_else(|| EvalError::Helper {
            name: "call",
            reason: format!("function {name:?} not defined"),
        })?;
        helper(self, args)
    }
}

/// 若路徑以 `from` 開頭則替換成 `to`
fn remap(_: &FieldFuncs, args: &[String]) -> Result<String, EvalError> {
    let [path, from, to] = args else {
        return Err(arity_error("remap", args));
    };
    Ok(match path.strip_prefix(from.as_str()) {
        Some(rest) => format!("{to}{rest}"),
        None => path.clone(),
    })
}

/// 去掉最後一段後整理路徑：`a/b/` -> `a/b`，`a/b` -> `a`
fn dirname(_: &FieldFuncs, args: &[String]) -> Result<String, EvalError> {
    let [path] = args else {
        return Err(arity_error("dirname", args));
    };
    let dir = path
        .rfind(std::path::is_separator)
        .map_or("", |i| &path[..=i]);
    Ok(clean_path(Path::new(dir)).to_string_lossy().into_owned())
}

fn abspath(_: &FieldFuncs, args: &[String]) -> Result<String, EvalError> {
    let [path] = args else {
        return Err(arity_error("abspath", args));
    };
    std::path::absolute(path)
        .map(|p| clean_path(&p).to_string_lossy().into_owned())
        .map_err(|e| EvalError::Helper {
            name: "abspath",
            reason: e.to_string(),
        })
}

/// 執行允許清單中的指令並回傳其輸出
fn output(funcs: &FieldFuncs, args: &[String]) -> Result<String, EvalError> {
    let Some((command, rest)) = args.split_first() else {
        return Err(EvalError::Helper {
            name: "output",
            reason: "command not specified".to_string(),
        });
    };
    if !funcs.is_allowed(command) {
        return Err(EvalError::UnsafeCommand(command.clone()));
    }

    let result = Process::new(command)
        .args(rest)
        .output()
        .map_err(|e| EvalError::CommandFailed(format!("{command}: {e}")))?;

    let mut combined = String::from_utf8_lossy(&result.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&result.stderr));
    if !result.status.success() {
        return Err(EvalError::CommandFailed(combined));
    }
    Ok(combined)
}

fn arity_error(name: &'static str, args: &[String]) -> EvalError {
    EvalError::Helper {
        name,
        reason: format!("unexpected {} arguments", args.len()),
    }
}

/// 所有欄位的已編譯樣板
#[derive(Debug)]
pub struct FieldEvaluator {
    sequence: HashMap<String, FieldTemplate>,
    movie: HashMap<String, FieldTemplate>,
    funcs: FieldFuncs,
}

impl FieldEvaluator {
    /// Compiles every sequence and movie field of `config`.
    pub fn compile(config: &Config, funcs: FieldFuncs) -> Result<Self> {
        let sequence = Self::compile_fields("seq", &config.seq.fields, &funcs)?;
        let movie = Self::compile_fields("mov", &config.mov.fields, &funcs)?;
        Ok(Self {
            sequence,
            movie,
            funcs,
        })
    }

    fn compile_fields(
        category: &str,
        fields: &[Field],
        funcs: &FieldFuncs,
    ) -> Result<HashMap<String, FieldTemplate>> {
        fields
            .iter()
            .map(|field| {
                let template = FieldTemplate::compile(&field.value, funcs).with_context(|| {
                    format!("could not compile {category} field {:?}", field.name)
                })?;
                Ok((field.name.clone(), template))
            })
            .collect()
    }

    /// 以 `entity` 為唯一變數執行欄位樣板，結果去除前後空白
    pub fn evaluate(&self, field: &str, entity: &Entity) -> Result<String, EvalError> {
        let templates = match entity {
            Entity::Sequence(_) => &self.sequence,
            Entity::Movie(_) => &self.movie,
        };
        let template = templates.get(field).ok_or_else(|| EvalError::UndefinedField {
            field: field.to_string(),
            kind: entity.kind(),
        })?;

        let mut out = String::new();
        for segment in &template.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Action(pipeline) => out.push_str(&self.run_pipeline(pipeline, entity)?),
            }
        }
        Ok(out.trim().to_string())
    }

    fn run_pipeline(&self, pipeline: &Pipeline, entity: &Entity) -> Result<String, EvalError> {
        let mut piped: Option<String> = None;
        for command in &pipeline.commands {
            let value = match command {
                Command::Value(operand) => self.resolve(operand, entity)?,
                Command::Call { name, args } => {
                    let mut values = args
                        .iter()
                        .map(|arg| self.resolve(arg, entity))
                        .collect::<Result<Vec<_>, _>>()?;
                    values.extend(piped.take());
                    self.funcs.call(name, &values)?
                }
            };
            piped = Some(value);
        }
        Ok(piped.unwrap_or_default())
    }

    fn resolve(&self, operand: &Operand, entity: &Entity) -> Result<String, EvalError> {
        match operand {
            Operand::Field(name) => entity.lookup(name),
            Operand::Literal(value) => Ok(value.clone()),
            Operand::Nested(pipeline) => self.run_pipeline(pipeline, entity),
        }
    }
}
