use crate::channel::{AnimationChannel, BinaryAnimationChannel, BinaryState};

/// Control over a set of channels driven together.
///
/// Group commands reach every binary member; state queries read the first
/// binary member, which by convention leads the group.
pub trait ChannelGroup {
    fn visit_channels_mut(&mut self, f: &mut dyn FnMut(&mut AnimationChannel));

    fn first_binary(&self) -> Option<&BinaryAnimationChannel>;

    fn activate_all(&mut self) {
        self.visit_channels_mut(&mut |channel| {
            if let Some(binary) = channel.as_binary_mut() {
                binary.activate();
            }
        });
    }

    fn deactivate_all(&mut self) {
        self.visit_channels_mut(&mut |channel| {
            if let Some(binary) = channel.as_binary_mut() {
                binary.deactivate();
            }
        });
    }

    fn toggle_all(&mut self) {
        self.visit_channels_mut(&mut |channel| {
            if let Some(binary) = channel.as_binary_mut() {
                binary.toggle();
            }
        });
    }

    fn state(&self) -> Option<BinaryState> {
        self.first_binary().map(BinaryAnimationChannel::state)
    }

    fn progress(&self) -> Option<f32> {
        self.first_binary().map(BinaryAnimationChannel::progress)
    }

    fn transition_duration(&self) -> Option<f32> {
        self.first_binary()
            .map(BinaryAnimationChannel::transition_duration)
    }

    fn is_active(&self) -> bool {
        self.first_binary().is_some_and(BinaryAnimationChannel::is_active)
    }

    fn is_inactive(&self) -> bool {
        self.first_binary()
            .is_some_and(BinaryAnimationChannel::is_inactive)
    }

    fn is_animating(&self) -> bool {
        self.first_binary()
            .is_some_and(BinaryAnimationChannel::is_animating)
    }
}

/// A named, ordered group of channels.
#[derive(Debug, Clone)]
pub struct AnimationLayer {
    id: String,
    channels: Vec<AnimationChannel>,
}

impl AnimationLayer {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            channels: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_channel(mut self, channel: impl Into<AnimationChannel>) -> Self {
        self.channels.push(channel.into());
        self
    }

    pub fn add_channel(&mut self, channel: impl Into<AnimationChannel>) {
        self.channels.push(channel.into());
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn channels(&self) -> &[AnimationChannel] {
        &self.channels
    }

    pub fn channels_mut(&mut self) -> &mut [AnimationChannel] {
        &mut self.channels
    }

    #[must_use]
    pub fn channel(&self, id: &str) -> Option<&AnimationChannel> {
        self.channels.iter().find(|c| c.id() == id)
    }

    pub fn channel_mut(&mut self, id: &str) -> Option<&mut AnimationChannel> {
        self.channels.iter_mut().find(|c| c.id() == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Advances every member in order.
    pub fn update(&mut self, delta_time: f32) {
        for channel in &mut self.channels {
            channel.update(delta_time);
        }
    }

    pub(crate) fn into_parts(self) -> (String, Vec<AnimationChannel>) {
        (self.id, self.channels)
    }
}

impl ChannelGroup for AnimationLayer {
    fn visit_channels_mut(&mut self, f: &mut dyn FnMut(&mut AnimationChannel)) {
        self.channels.iter_mut().for_each(f);
    }

    fn first_binary(&self) -> Option<&BinaryAnimationChannel> {
        self.channels.iter().find_map(AnimationChannel::as_binary)
    }
}
