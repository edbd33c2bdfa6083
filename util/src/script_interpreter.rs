//! # Input script interpreter
//!
//! Input scripts replay updater inputs at fixed times, which allows the updater to be driven
//! without any live publishers. Each entry in a script is a timestamp in seconds followed by the
//! JSON form of an input message, terminated with a semicolon:
//!
//! ```text
//! 0.0: {"Velocity": {"linear_x_ms": 10.0}};
//! 2.5: {"StopSignal": {"index": 40}};
//! ```
//!
//! Anything which does not match this form (comments, blank lines) is ignored.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use regex::RegexBuilder;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal
use comms_if::msg::{InputMsg, MsgParseError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An input which is scripted to occur at a specific time.
#[derive(Debug, Clone)]
pub struct ScriptedInput {
    /// The time the input is supposed to be delivered at
    pub exec_time_s: f64,

    /// The input message
    pub msg: InputMsg,
}

/// A script interpreter.
///
/// After initialising with the path to the script use `.get_pending` to acquire the inputs whose
/// time has come.
#[derive(Debug)]
pub struct ScriptInterpreter {
    script_path: Option<PathBuf>,
    inputs: VecDeque<ScriptedInput>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0:?}")]
    ScriptNotFound(PathBuf),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)"
    )]
    InvalidTimestamp(String),

    #[error("Script contains an invalid input at {0} s: {1}")]
    InvalidInput(f64, MsgParseError),

    #[error("Script timestamps must not decrease, found {1} s after {0} s")]
    OutOfOrder(f64, f64),
}

#[derive(Debug)]
pub enum PendingInputs {
    None,
    Some(Vec<InputMsg>),
    EndOfScript,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {
    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {
        let path = PathBuf::from(script_path.as_ref());

        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(path));
        }

        let script = fs::read_to_string(&path).map_err(ScriptError::ScriptLoadError)?;

        let mut interp = Self::from_str(&script)?;
        interp.script_path = Some(path);

        Ok(interp)
    }

    /// Create a new interpreter from the contents of a script.
    pub fn from_str(script: &str) -> Result<Self, ScriptError> {
        let mut inputs: VecDeque<ScriptedInput> = VecDeque::new();

        // Go through the script executing __the magic regex__.
        let re = RegexBuilder::new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .expect("Script regex is invalid");

        for cap in re.captures_iter(script) {
            let time_str = cap.get(1).map(|m| m.as_str()).unwrap_or_default();
            let exec_time_s: f64 = time_str
                .parse()
                .map_err(|e| ScriptError::InvalidTimestamp(format!("{}", e)))?;

            if let Some(prev) = inputs.back() {
                if exec_time_s < prev.exec_time_s {
                    return Err(ScriptError::OutOfOrder(prev.exec_time_s, exec_time_s));
                }
            }

            let payload = cap.get(3).map(|m| m.as_str()).unwrap_or_default();
            let msg = InputMsg::from_json(payload)
                .map_err(|e| ScriptError::InvalidInput(exec_time_s, e))?;

            inputs.push_back(ScriptedInput { exec_time_s, msg });
        }

        if inputs.is_empty() {
            return Err(ScriptError::ScriptEmpty);
        }

        Ok(ScriptInterpreter {
            script_path: None,
            inputs,
        })
    }

    /// Return the inputs which are due at `current_time_s`.
    ///
    /// An input is due once the current time has reached its timestamp.
    pub fn get_pending(&mut self, current_time_s: f64) -> PendingInputs {
        if self.inputs.is_empty() {
            return PendingInputs::EndOfScript;
        }

        let mut pending = vec![];

        while let Some(front) = self.inputs.front() {
            if front.exec_time_s > current_time_s {
                break;
            }
            if let Some(input) = self.inputs.pop_front() {
                pending.push(input.msg);
            }
        }

        if pending.is_empty() {
            PendingInputs::None
        } else {
            PendingInputs::Some(pending)
        }
    }

    /// Iterate over the remaining inputs in the script.
    pub fn inputs(&self) -> impl Iterator<Item = &ScriptedInput> {
        self.inputs.iter()
    }

    /// Get the path the script was loaded from, if any
    pub fn script_path(&self) -> Option<&Path> {
        self.script_path.as_deref()
    }

    /// Get the number of inputs remaining in the script
    pub fn get_num_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.inputs.back() {
            Some(c) => c.exec_time_s,
            None => 0f64,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SCRIPT: &str = r#"
        # Comments don't match and are skipped
        0.0: {"Velocity": {"linear_x_ms": 4.0}};
        0.0: {"StopSignal": {"index": -1}};
        1.5: {"StopSignal": {"index": 12}};
        3.0: "Shutdown";
    "#;

    #[test]
    fn test_parse() {
        let interp = ScriptInterpreter::from_str(SCRIPT).unwrap();

        assert_eq!(interp.get_num_inputs(), 4);
        assert_eq!(interp.get_duration(), 3.0);
        assert!(interp.script_path().is_none());
    }

    #[test]
    fn test_pending() {
        let mut interp = ScriptInterpreter::from_str(SCRIPT).unwrap();

        match interp.get_pending(0.0) {
            PendingInputs::Some(v) => assert_eq!(v.len(), 2),
            p => panic!("Expected two inputs, got {:?}", p),
        }

        assert!(matches!(interp.get_pending(1.0), PendingInputs::None));

        match interp.get_pending(2.0) {
            PendingInputs::Some(v) => {
                assert_eq!(v.len(), 1);
                assert_eq!(v[0].channel_name(), "stop_signal");
            }
            p => panic!("Expected one input, got {:?}", p),
        }

        match interp.get_pending(10.0) {
            PendingInputs::Some(v) => assert!(matches!(v[0], InputMsg::Shutdown)),
            p => panic!("Expected shutdown, got {:?}", p),
        }

        assert!(matches!(interp.get_pending(11.0), PendingInputs::EndOfScript));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            ScriptInterpreter::from_str("nothing here"),
            Err(ScriptError::ScriptEmpty)
        ));
        assert!(matches!(
            ScriptInterpreter::from_str(r#"0.0: {"Nope": 1};"#),
            Err(ScriptError::InvalidInput(_, _))
        ));
        assert!(matches!(
            ScriptInterpreter::from_str(
                "2.0: {\"Velocity\": {\"linear_x_ms\": 1.0}};\n1.0: \"Shutdown\";"
            ),
            Err(ScriptError::OutOfOrder(_, _))
        ));
        assert!(matches!(
            ScriptInterpreter::new("/definitely/not/a/script.wps"),
            Err(ScriptError::ScriptNotFound(_))
        ));
    }
}
