use super::Slice;
use serde::{Deserialize, Serialize};

/// Counter value plus every value it held before a mutation.
///
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterState {
    pub value: i64,
    pub history: Vec<i64>,
    #[serde(skip)]
    pub error: Option<String>,
}

/// Specify the counter commands.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CounterCommand {
    Increment,
    Decrement,
    AddAmount(i64),
    Reset,
    ClearHistory,
    ClearError,
}

impl CounterState {
    /// Apply a command. Value-changing commands log the prior value first.
    ///
    pub fn apply(&mut self, command: CounterCommand) {
        match command {
            CounterCommand::Increment => self.change(|v| v.saturating_add(1)),
            CounterCommand::Decrement => self.change(|v| v.saturating_sub(1)),
            CounterCommand::AddAmount(amount) => self.change(|v| v.saturating_add(amount)),
            CounterCommand::Reset => self.change(|_| 0),
            CounterCommand::ClearHistory => self.history.clear(),
            CounterCommand::ClearError => self.error = None,
        }
    }

    fn change(&mut self, f: impl FnOnce(i64) -> i64) {
        self.history.push(self.value);
        self.value = f(self.value);
    }
}

impl Slice for CounterState {
    fn record_error(&mut self, message: String) {
        self.error = Some(message);
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(commands: Vec<CounterCommand>) -> CounterState {
        let mut state = CounterState::default();
        for command in commands {
            state.apply(command);
        }
        state
    }

    #[test]
    fn increment_add_reset_scenario() {
        let state = run(vec![
            CounterCommand::Increment,
            CounterCommand::Increment,
            CounterCommand::AddAmount(5),
            CounterCommand::Reset,
        ]);
        assert_eq!(state.value, 0);
        assert_eq!(state.history, vec![0, 1, 2, 7]);
    }

    #[test]
    fn history_records_value_before_each_mutation() {
        let commands = vec![
            CounterCommand::Decrement,
            CounterCommand::AddAmount(10),
            CounterCommand::Increment,
            CounterCommand::AddAmount(-3),
        ];
        let mut state = CounterState::default();
        let mut before = vec![];
        for command in commands.clone() {
            before.push(state.value);
            state.apply(command);
        }
        assert_eq!(state.history.len(), commands.len());
        assert_eq!(state.history, before);
        assert_eq!(state.value, 7);
    }

    #[test]
    fn clear_history_keeps_value() {
        let mut state = run(vec![CounterCommand::Increment, CounterCommand::Increment]);
        state.apply(CounterCommand::ClearHistory);
        assert_eq!(state.value, 2);
        assert!(state.history.is_empty());
    }

    #[test]
    fn add_amount_saturates() {
        let mut state = CounterState {
            value: i64::MAX,
            ..CounterState::default()
        };
        state.apply(CounterCommand::Increment);
        assert_eq!(state.value, i64::MAX);
    }

    #[test]
    fn error_is_not_persisted() {
        let mut state = CounterState::default();
        state.record_error("disk full".to_string());
        let json = serde_json::to_string(&state).unwrap();
        assert!(!json.contains("disk full"));
        state.apply(CounterCommand::ClearError);
        assert!(state.error.is_none());
    }
}
