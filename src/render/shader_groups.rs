use crate::scene::HitGroup;

/// Shader groups of the ray tracing pipeline, in pipeline and binding table order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderGroup {
    RayGen,
    Miss,
    TrianglesHitGroup,
    SphereHitGroup,
    BoxHitGroup,
}

impl ShaderGroup {
    pub const ALL: [ShaderGroup; 5] = [
        ShaderGroup::RayGen,
        ShaderGroup::Miss,
        ShaderGroup::TrianglesHitGroup,
        ShaderGroup::SphereHitGroup,
        ShaderGroup::BoxHitGroup,
    ];

    pub const FIRST_HIT_GROUP: ShaderGroup = ShaderGroup::TrianglesHitGroup;

    pub const COUNT: u32 = Self::ALL.len() as u32;

    pub fn index(self) -> u32 {
        self as u32
    }

    pub fn is_hit_group(self) -> bool {
        self.index() >= Self::FIRST_HIT_GROUP.index()
    }

    pub fn hit_groups() -> impl Iterator<Item = ShaderGroup> {
        Self::ALL.into_iter().filter(|group| group.is_hit_group())
    }
}

impl From<HitGroup> for ShaderGroup {
    fn from(hit_group: HitGroup) -> Self {
        match hit_group {
            HitGroup::Triangles => ShaderGroup::TrianglesHitGroup,
            HitGroup::Sphere => ShaderGroup::SphereHitGroup,
            HitGroup::Box => ShaderGroup::BoxHitGroup,
        }
    }
}

impl HitGroup {
    /// Offset stored in an instance record. The device adds it to the start of the hit region.
    pub fn binding_table_offset(self) -> u32 {
        ShaderGroup::from(self).index() - ShaderGroup::FIRST_HIT_GROUP.index()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_are_numbered_in_order() {
        for (position, group) in ShaderGroup::ALL.iter().enumerate() {
            assert_eq!(group.index() as usize, position);
        }
        assert_eq!(ShaderGroup::COUNT, 5);
    }

    #[test]
    fn hit_group_offsets_start_at_zero() {
        assert_eq!(HitGroup::Triangles.binding_table_offset(), 0);
        assert_eq!(HitGroup::Sphere.binding_table_offset(), 1);
        assert_eq!(HitGroup::Box.binding_table_offset(), 2);
    }

    #[test]
    fn hit_groups_follow_ray_generation_and_miss() {
        let hit_groups: Vec<_> = ShaderGroup::hit_groups().collect();
        assert_eq!(
            hit_groups,
            vec![
                ShaderGroup::TrianglesHitGroup,
                ShaderGroup::SphereHitGroup,
                ShaderGroup::BoxHitGroup
            ]
        );
        assert!(!ShaderGroup::Miss.is_hit_group());
    }
}
