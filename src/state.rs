// state.rs

use crate::*;

/// Everything a request handler needs, built once in main().
pub struct MyState {
    pub settings: Arc<SettingsStore>,
    pub controller: ControllerManager,
    pub api_cnt: AtomicU64,
    pub started: DateTime<Local>,
}

impl MyState {
    pub fn new(settings: Arc<SettingsStore>, client: Arc<dyn ControllerClient>) -> Self {
        MyState {
            controller: ControllerManager::new(client, settings.clone()),
            settings,
            api_cnt: AtomicU64::new(0),
            started: Local::now(),
        }
    }
}
// EOF
