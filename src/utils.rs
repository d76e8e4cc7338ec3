use crate::types::{Channel, Position, Quaternion};
use cgmath::{Deg, One, Rotation3};

/// Compose the rotation of a joint from its channel values (in DEGREES).
/// Rotations are applied in the order the channels were declared, so `Zrotation Xrotation Yrotation`
/// yields `Rz * Rx * Ry`.
pub(crate) fn channels_to_quat(channels: &[Channel], values: &[f64]) -> Quaternion {
    channels
        .iter()
        .zip(values)
        .fold(Quaternion::one(), |acc, (channel, &value)| match channel {
            Channel::Xrotation => acc * Quaternion::from_angle_x(Deg(value)),
            Channel::Yrotation => acc * Quaternion::from_angle_y(Deg(value)),
            Channel::Zrotation => acc * Quaternion::from_angle_z(Deg(value)),
            _ => acc,
        })
}

/// Translation carried by the positional channels of a joint (zero when it has none).
pub(crate) fn channels_to_translation(channels: &[Channel], values: &[f64]) -> Position {
    let mut translation = Position::new(0.0, 0.0, 0.0);
    for (channel, &value) in channels.iter().zip(values) {
        match channel {
            Channel::Xposition => translation.x += value,
            Channel::Yposition => translation.y += value,
            Channel::Zposition => translation.z += value,
            _ => {}
        }
    }
    translation
}
