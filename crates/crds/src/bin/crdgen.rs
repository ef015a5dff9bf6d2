//! Prints the MultiArchBuildConfig CRD as YAML
//!
//! Usage: `cargo run -p crds --bin crdgen > config/crd/multiarchbuildconfigs.yaml`

use crds::MultiArchBuildConfig;
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&MultiArchBuildConfig::crd())?);
    Ok(())
}
