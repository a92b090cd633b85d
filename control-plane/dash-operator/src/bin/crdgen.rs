//! Print the DashApplication CustomResourceDefinition as YAML.

use dash_operator::crd::dash_application::DashApplication;
use kube::core::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&DashApplication::crd())?);
    Ok(())
}
