use crate::workflow::config::VehicleSection;
use alertcore::math::{Position, Vec2};
use alertcore::prelude::{Indicator, Platform, VehicleControl, VehicleMobility};

/// Kinematic stand-in for a vehicle driven by the traffic simulation.
#[derive(Debug, Clone)]
pub struct SimulatedVehicle {
    position: Position,
    heading_deg: f64,
    commanded_speed: Option<f64>,
    indicator: Indicator,
}

impl SimulatedVehicle {
    pub fn new(position: Position, heading_deg: f64) -> Self {
        Self {
            position,
            heading_deg,
            commanded_speed: None,
            indicator: Indicator::White,
        }
    }

    /// Last commanded speed; `None` until the first command.
    pub fn commanded_speed(&self) -> Option<f64> {
        self.commanded_speed
    }

    pub fn indicator(&self) -> Indicator {
        self.indicator
    }

    /// Speed the vehicle actually drives at. A released (negative) or absent
    /// command falls back to `cruise_speed`.
    pub fn effective_speed(&self, cruise_speed: f64) -> f64 {
        match self.commanded_speed {
            Some(speed) if speed >= 0.0 => speed,
            _ => cruise_speed,
        }
    }

    /// Moves along the current heading for `dt` seconds.
    pub fn advance(&mut self, dt: f64, cruise_speed: f64) {
        if dt <= 0.0 {
            return;
        }
        let step = self.effective_speed(cruise_speed) * dt;
        let forward = Vec2::from_heading_deg(self.heading_deg);
        self.position = Position::new(
            self.position.x + forward.x * step,
            self.position.y + forward.y * step,
        );
    }
}

impl VehicleControl for SimulatedVehicle {
    fn set_speed(&mut self, speed: f64) {
        self.commanded_speed = Some(speed);
    }

    fn set_indicator(&mut self, indicator: Indicator) {
        self.indicator = indicator;
    }
}

impl VehicleMobility for SimulatedVehicle {
    fn position(&self) -> Position {
        self.position
    }

    fn heading_deg(&self) -> f64 {
        self.heading_deg
    }
}

/// A simulated node: a vehicle, or a fixed unit without mobility.
#[derive(Debug, Clone)]
pub struct SimNode {
    vehicle: Option<SimulatedVehicle>,
}

impl SimNode {
    pub fn vehicle(vehicle: SimulatedVehicle) -> Self {
        Self {
            vehicle: Some(vehicle),
        }
    }

    pub fn stationary() -> Self {
        Self { vehicle: None }
    }

    pub fn from_section(section: &VehicleSection) -> Self {
        if section.mobile {
            Self::vehicle(SimulatedVehicle::new(section.position(), section.heading_deg))
        } else {
            Self::stationary()
        }
    }

    pub fn simulated_vehicle(&self) -> Option<&SimulatedVehicle> {
        self.vehicle.as_ref()
    }

    pub fn simulated_vehicle_mut(&mut self) -> Option<&mut SimulatedVehicle> {
        self.vehicle.as_mut()
    }

    /// Actuator state for the live status line.
    pub fn status(&self) -> String {
        match &self.vehicle {
            Some(vehicle) => {
                let [r, g, b, a] = vehicle.indicator().rgba();
                let speed = vehicle
                    .commanded_speed()
                    .map(|speed| format!("{:.1}", speed))
                    .unwrap_or_else(|| "-".to_string());
                format!(
                    "speed: {}, indicator: #{:02x}{:02x}{:02x}{:02x}",
                    speed, r, g, b, a
                )
            }
            None => "stationary".to_string(),
        }
    }
}

impl Platform for SimNode {
    fn mobility(&mut self) -> Option<&mut dyn VehicleMobility> {
        self.vehicle
            .as_mut()
            .map(|vehicle| vehicle as &mut dyn VehicleMobility)
    }
}
