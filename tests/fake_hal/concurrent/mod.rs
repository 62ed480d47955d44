use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::Mutex;

lazy_static! {
    static ref DATA_INDICES_MAP: Mutex<HashMap<&'static str, usize>> = Mutex::new(HashMap::new());
    static ref CALL_LOGS_MAP: Mutex<HashMap<&'static str, Vec<String>>> =
        Mutex::new(HashMap::new());
}

pub fn set_named_value(name: &'static str, value: usize) {
    let mut map = DATA_INDICES_MAP.lock().unwrap();
    map.insert(name, value);
}

pub fn get_and_increment_named_value(name: &str) -> usize {
    let mut map = DATA_INDICES_MAP.lock().unwrap();
    let index = map.get_mut(name).unwrap();
    *index += 1;
    *index - 1
}

/// Starts an empty call log under `name`. Tests run in parallel, so every test needs its own name.
pub fn reset_call_log(name: &'static str) {
    let mut map = CALL_LOGS_MAP.lock().unwrap();
    map.insert(name, Vec::new());
}

pub fn record_call(name: &'static str, call: String) {
    let mut map = CALL_LOGS_MAP.lock().unwrap();
    map.entry(name).or_default().push(call);
}

pub fn call_log(name: &str) -> Vec<String> {
    let map = CALL_LOGS_MAP.lock().unwrap();
    map.get(name).cloned().unwrap_or_default()
}

/// How often `call` appears in the log under `name`.
pub fn count_calls(name: &str, call: &str) -> usize {
    call_log(name).iter().filter(|c| c.as_str() == call).count()
}
