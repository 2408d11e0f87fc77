//! This module defines various unit types and their conversions.
//!
//! Flows are measured in m³/s and stored volumes in hm³ (millions of m³).

/// Number of hm³ released by a flow of 1 m³/s sustained for one hour (3600 s / 10⁶)
pub const FLOW_HOUR_TO_VOLUME: f64 = 0.0036;

macro_rules! unit_struct {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            PartialOrd,
            Default,
            derive_more::Add,
            derive_more::Sub,
            derive_more::Display,
            serde::Deserialize,
            serde::Serialize,
        )]
        pub struct $name(pub f64);

        impl $name {
            /// Creates a new instance of the unit type from a f64 value.
            pub fn new(val: f64) -> Self {
                Self(val)
            }

            /// Returns the value of the unit type as a f64.
            pub fn value(self) -> f64 {
                self.0
            }

            /// Whether the underlying value is finite
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }
        }

        impl std::ops::Neg for $name {
            type Output = $name;
            fn neg(self) -> $name {
                $name(-self.0)
            }
        }
    };
}

macro_rules! impl_mul {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Mul<$Rhs> for $Lhs {
            type Output = $Out;
            fn mul(self, rhs: $Rhs) -> $Out {
                <$Out>::new(self.0 * rhs.0)
            }
        }
        impl std::ops::Mul<$Lhs> for $Rhs {
            type Output = $Out;
            fn mul(self, lhs: $Lhs) -> $Out {
                <$Out>::new(self.0 * lhs.0)
            }
        }
    };
}

unit_struct!(
    /// A volumetric flow rate in m³/s
    Flow
);
unit_struct!(
    /// A stored volume of water in hm³
    Volume
);
unit_struct!(
    /// A duration in hours
    Hours
);
unit_struct!(
    /// Electrical power in MW
    Power
);
unit_struct!(
    /// Power produced per unit of turbined flow, in MW/(m³/s)
    PowerPerFlow
);

impl_mul!(PowerPerFlow, Flow, Power);

impl Flow {
    /// The volume of water moved by this flow over the given duration
    pub fn volume_over(self, duration: Hours) -> Volume {
        Volume(self.0 * duration.0 * FLOW_HOUR_TO_VOLUME)
    }
}

impl Hours {
    /// Round to a whole number of hours, with ties going to the even neighbour.
    ///
    /// Negative and non-finite values are not meaningful durations and map to zero.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn round_to_periods(self) -> u32 {
        if !self.0.is_finite() || self.0 <= 0.0 {
            return 0;
        }

        self.0.round_ties_even().min(f64::from(u32::MAX)) as u32
    }
}
