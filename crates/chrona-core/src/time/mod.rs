// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Time primitives: the per-tick clock and the deferred callback queue.
//!
//! Neither type is internally synchronized. They are meant to be owned by a
//! single module and touched from the tick thread; anything shared with other
//! threads has to be wrapped by its owner.

pub mod clock;
pub mod timers;

pub use clock::{Clock, ClockSnapshot};
pub use timers::{DueTimer, Rearm, TimerId, TimerQueue};
