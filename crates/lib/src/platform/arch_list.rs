//! Static per-architecture tables: valid arch variants, cpu variants, arch
//! features, and the features each android arch variant implies.

use serde::Serialize;

use super::arch::ArchType;

pub fn arch_variants(arch: ArchType) -> &'static [&'static str] {
  match arch {
    ArchType::Arm => &["armv7-a", "armv7-a-neon", "armv8-a", "armv8-2a"],
    ArchType::Arm64 => &["armv8-a", "armv8-a-branchprot", "armv8-2a", "armv8-2a-dotprod", "armv9-a"],
    ArchType::X86 => &[
      "amberlake",
      "atom",
      "broadwell",
      "goldmont",
      "goldmont-plus",
      "goldmont-without-sha-xsaves",
      "haswell",
      "icelake",
      "ivybridge",
      "kabylake",
      "sandybridge",
      "silvermont",
      "skylake",
      "stoneyridge",
      "tigerlake",
      "tremont",
      "whiskeylake",
      "x86_64",
    ],
    ArchType::X86_64 => &[
      "amberlake",
      "broadwell",
      "goldmont",
      "goldmont-plus",
      "goldmont-without-sha-xsaves",
      "haswell",
      "icelake",
      "ivybridge",
      "kabylake",
      "sandybridge",
      "silvermont",
      "skylake",
      "stoneyridge",
      "tigerlake",
      "tremont",
      "whiskeylake",
    ],
    ArchType::Riscv64 | ArchType::Common => &[],
  }
}

pub fn cpu_variants(arch: ArchType) -> &'static [&'static str] {
  match arch {
    ArchType::Arm => &[
      "cortex-a7",
      "cortex-a8",
      "cortex-a9",
      "cortex-a15",
      "cortex-a32",
      "cortex-a53",
      "cortex-a53.a57",
      "cortex-a55",
      "cortex-a72",
      "cortex-a73",
      "cortex-a75",
      "cortex-a76",
      "krait",
      "kryo",
      "kryo385",
      "exynos-m1",
      "exynos-m2",
    ],
    ArchType::Arm64 => &[
      "cortex-a53",
      "cortex-a55",
      "cortex-a72",
      "cortex-a73",
      "cortex-a75",
      "cortex-a76",
      "kryo",
      "kryo385",
      "exynos-m1",
      "exynos-m2",
    ],
    ArchType::Riscv64 | ArchType::X86 | ArchType::X86_64 | ArchType::Common => &[],
  }
}

/// Every feature an arch-feature block can be declared for, in declaration order
pub fn arch_features(arch: ArchType) -> &'static [&'static str] {
  match arch {
    ArchType::Arm => &["neon"],
    ArchType::Arm64 => &["dotprod"],
    ArchType::X86 => &[
      "ssse3", "sse4", "sse4_1", "sse4_2", "aes_ni", "avx", "avx2", "avx512", "popcnt", "movbe",
    ],
    ArchType::X86_64 => &["ssse3", "sse4", "sse4_1", "sse4_2", "aes_ni", "avx", "avx2", "avx512", "popcnt"],
    ArchType::Riscv64 | ArchType::Common => &[],
  }
}

const X86_AVX512: &[&str] = &["ssse3", "sse4", "sse4_1", "sse4_2", "avx", "avx2", "avx512", "aes_ni", "popcnt"];
const X86_AVX2: &[&str] = &["ssse3", "sse4", "sse4_1", "sse4_2", "avx", "avx2", "aes_ni", "popcnt"];
const X86_AVX: &[&str] = &["ssse3", "sse4", "sse4_1", "sse4_2", "aes_ni", "avx", "popcnt"];
const X86_SSE42: &[&str] = &["ssse3", "sse4", "sse4_1", "sse4_2", "popcnt"];
const X86_AES: &[&str] = &["ssse3", "sse4", "sse4_1", "sse4_2", "aes_ni", "popcnt"];

/// (arch variant, features) pairs for android targets.
pub fn android_arch_feature_map(arch: ArchType) -> &'static [(&'static str, &'static [&'static str])] {
  match arch {
    ArchType::Arm => &[("armv7-a-neon", &["neon"]), ("armv8-a", &["neon"]), ("armv8-2a", &["neon"])],
    ArchType::Arm64 => &[("armv8-2a-dotprod", &["dotprod"]), ("armv9-a", &["dotprod"])],
    ArchType::X86 => &[
      ("amberlake", X86_AVX2),
      ("atom", &["ssse3", "movbe"]),
      ("broadwell", X86_AVX2),
      ("goldmont", &["ssse3", "sse4", "sse4_1", "sse4_2", "aes_ni", "popcnt", "movbe"]),
      ("goldmont-plus", &["ssse3", "sse4", "sse4_1", "sse4_2", "aes_ni", "popcnt", "movbe"]),
      ("goldmont-without-sha-xsaves", &["ssse3", "sse4", "sse4_1", "sse4_2", "aes_ni", "popcnt", "movbe"]),
      ("haswell", &["ssse3", "sse4", "sse4_1", "sse4_2", "aes_ni", "avx", "popcnt", "movbe"]),
      ("icelake", X86_AVX512),
      ("ivybridge", X86_AVX),
      ("kabylake", X86_AVX2),
      ("sandybridge", X86_SSE42),
      ("silvermont", &["ssse3", "sse4", "sse4_1", "sse4_2", "aes_ni", "popcnt", "movbe"]),
      ("skylake", X86_AVX512),
      ("stoneyridge", &["ssse3", "sse4", "sse4_1", "sse4_2", "aes_ni", "avx", "avx2", "popcnt", "movbe"]),
      ("tigerlake", X86_AVX512),
      ("tremont", &["ssse3", "sse4", "sse4_1", "sse4_2", "aes_ni", "popcnt", "movbe"]),
      ("whiskeylake", X86_AVX512),
      ("x86_64", X86_SSE42),
    ],
    ArchType::X86_64 => &[
      ("amberlake", X86_AVX2),
      ("broadwell", X86_AVX2),
      ("goldmont", X86_AES),
      ("goldmont-plus", X86_AES),
      ("goldmont-without-sha-xsaves", X86_AES),
      ("haswell", X86_AVX),
      ("icelake", X86_AVX512),
      ("ivybridge", X86_AVX),
      ("kabylake", X86_AVX2),
      ("sandybridge", X86_SSE42),
      ("silvermont", X86_AES),
      ("skylake", X86_AVX512),
      ("stoneyridge", X86_AVX2),
      ("tigerlake", X86_AVX512),
      ("tremont", X86_AES),
      ("whiskeylake", X86_AVX512),
    ],
    ArchType::Riscv64 | ArchType::Common => &[],
  }
}

/// Features implied by an android arch variant; empty for unknown variants.
pub fn android_arch_features(arch: ArchType, variant: &str) -> &'static [&'static str] {
  android_arch_feature_map(arch)
    .iter()
    .find(|(v, _)| *v == variant)
    .map(|(_, features)| *features)
    .unwrap_or(&[])
}

/// A fixed device arch configuration used for NDK and mainline builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchConfig {
  pub arch: &'static str,
  pub arch_variant: &'static str,
  pub cpu_variant: &'static str,
  #[serde(rename = "abis")]
  pub abi: &'static [&'static str],
}

/// Arch configs the NDK API stubs and static libraries are built for
pub fn ndk_abis_config() -> Vec<ArchConfig> {
  vec![
    ArchConfig { arch: "arm64", arch_variant: "armv8-a-branchprot", cpu_variant: "", abi: &["arm64-v8a"] },
    ArchConfig { arch: "arm", arch_variant: "armv7-a-neon", cpu_variant: "", abi: &["armeabi-v7a"] },
    ArchConfig { arch: "riscv64", arch_variant: "", cpu_variant: "", abi: &["riscv64"] },
    ArchConfig { arch: "x86_64", arch_variant: "", cpu_variant: "", abi: &["x86_64"] },
    ArchConfig { arch: "x86", arch_variant: "", cpu_variant: "", abi: &["x86"] },
  ]
}

/// Arch configs supported by mainline modules
pub fn aml_abis_config() -> Vec<ArchConfig> {
  vec![
    ArchConfig { arch: "arm64", arch_variant: "armv8-a", cpu_variant: "", abi: &["arm64-v8a"] },
    ArchConfig { arch: "arm", arch_variant: "armv7-a-neon", cpu_variant: "", abi: &["armeabi-v7a"] },
    ArchConfig { arch: "x86_64", arch_variant: "", cpu_variant: "", abi: &["x86_64"] },
    ArchConfig { arch: "x86", arch_variant: "", cpu_variant: "", abi: &["x86"] },
  ]
}
