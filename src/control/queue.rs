use std::collections::VecDeque;

use crate::config::settings::CommandOrder;
use crate::control::command::ControlCommand;

/// Pending outbound commands, released in the configured order.
#[derive(Debug)]
pub struct CommandQueue {
    order: CommandOrder,
    items: VecDeque<ControlCommand>,
}

impl CommandQueue {
    pub fn new(order: CommandOrder) -> Self {
        Self {
            order,
            items: VecDeque::new(),
        }
    }

    pub fn order(&self) -> CommandOrder {
        self.order
    }

    pub fn push(&mut self, cmd: ControlCommand) {
        self.items.push_back(cmd);
    }

    pub fn pop(&mut self) -> Option<ControlCommand> {
        match self.order {
            CommandOrder::Fifo => self.items.pop_front(),
            CommandOrder::Lifo => self.items.pop_back(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/control/queue.rs"]
mod tests;
