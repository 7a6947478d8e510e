use std::sync::Arc;

use crate::encoder::Encoder;
use crate::engine::MatchEngine;
use crate::storage::DurableLog;

pub struct HandlerState<L, E>
where
    L: DurableLog + Send + Sync + 'static,
    E: Encoder + 'static,
{
    pub engine: Arc<MatchEngine<L, E>>,
}

impl<L, E> Clone for HandlerState<L, E>
where
    L: DurableLog + Send + Sync + 'static,
    E: Encoder + 'static,
{
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
        }
    }
}

impl<L, E> HandlerState<L, E>
where
    L: DurableLog + Send + Sync + 'static,
    E: Encoder + 'static,
{
    pub fn new(engine: Arc<MatchEngine<L, E>>) -> Self {
        Self { engine }
    }
}
