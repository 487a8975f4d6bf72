pub mod world_events;

use crate::events::world_events::*;
use bevy::prelude::*;

pub struct EventModule;

impl Plugin for EventModule {
    fn build(&self, app: &mut App) {
        app
            .add_event::<BlockRemovedEvent>()
            .add_event::<ChunkRegeneratedEvent>();
    }
}
