use super::{
    AndChain, Chain, CountedDelay, CountedRepeat, Every, Forever, Once, OrChain, Pusher, Repeat,
    Template,
};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Structured description of a fresh schedule tree.
///
/// ```yaml
/// kind: chain
/// of:
///   - kind: repeat
///     times: 2
///     of: { kind: every, ticks: 3 }
///   - kind: forever
///     of: { kind: after, ticks: 7 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    Once,
    After { ticks: u64 },
    Times { ticks: u64 },
    Every { ticks: u64 },
    DelayedEvery { after: u64, every: u64 },
    Repeat { times: u64, of: Box<Shape> },
    Forever { of: Box<Shape> },
    Chain { of: Vec<Shape> },
    And { of: Vec<Shape> },
    Or { of: Vec<Shape> },
}

impl Shape {
    pub fn build(&self) -> Result<Pusher> {
        let pusher = match self {
            Shape::Once => Once::new().into(),
            Shape::After { ticks } => CountedDelay::new(*ticks)?.into(),
            Shape::Times { ticks } => CountedRepeat::new(*ticks)?.into(),
            Shape::Every { ticks } => Every::new(*ticks)?.into(),
            Shape::DelayedEvery { after, every } => Chain::delayed_every(*after, *every)?.into(),
            Shape::Repeat { times, of } => Repeat::new(*times, Template::new(of.build()?))?.into(),
            Shape::Forever { of } => Forever::new(Template::new(of.build()?)).into(),
            Shape::Chain { of } => Chain::new(build_all(of)?)?.into(),
            Shape::And { of } => AndChain::new(build_all(of)?)?.into(),
            Shape::Or { of } => OrChain::new(build_all(of)?)?.into(),
        };
        Ok(pusher)
    }
}

fn build_all(shapes: &[Shape]) -> Result<Vec<Pusher>> {
    shapes.iter().map(Shape::build).collect()
}
