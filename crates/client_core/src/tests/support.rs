use std::sync::Mutex;

use shared::protocol::OutboundCommand;

use crate::CommandSink;

#[derive(Default)]
pub struct RecordingSink {
    commands: Mutex<Vec<OutboundCommand>>,
}

impl RecordingSink {
    pub fn commands(&self) -> Vec<OutboundCommand> {
        self.commands.lock().expect("sink lock").clone()
    }
}

impl CommandSink for RecordingSink {
    fn emit(&self, command: OutboundCommand) {
        self.commands.lock().expect("sink lock").push(command);
    }
}
